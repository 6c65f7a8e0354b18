//! Render strategies.
//!
//! A [`Strategy`] decides where the template and the renderer for a request
//! come from. It is chosen once at startup from the run [`Mode`] and never
//! changes while the server is running.

mod development;
mod fixed;
mod production;

pub use development::{DEFAULT_HMR_CLIENT, DevServer, DevelopmentStrategy, LocalDevServer};
pub use fixed::{FixedStrategy, TemplateSource};
pub use production::ProductionStrategy;

use axum::Router;
use ssr_pipeline_core::{AssetResolver, ClientEntry, DevAssets, Mode};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::renderer::Renderer;

/// Source of template and renderer for every request.
#[derive(Clone)]
pub enum Strategy {
    /// Per-request resolution through a dev server.
    Development(DevelopmentStrategy),
    /// Build output loaded once at startup.
    Production(ProductionStrategy),
    /// Caller-supplied renderer and template.
    Test(FixedStrategy),
}

impl Strategy {
    /// Mode this strategy implements.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Development(_) => Mode::Development,
            Self::Production(_) => Mode::Production,
            Self::Test(_) => Mode::Test,
        }
    }

    /// The HTML template for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Template`] or [`PipelineError::Transform`].
    pub async fn resolve_template(&self, url: &str) -> Result<String, PipelineError> {
        match self {
            Self::Development(dev) => dev.resolve_template(url).await,
            Self::Production(prod) => Ok(prod.template().to_string()),
            Self::Test(fixed) => fixed.resolve_template().await,
        }
    }

    /// The renderer for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RendererResolution`] if the dev server cannot
    /// load the page module.
    pub async fn resolve_renderer(&self, url: &str) -> Result<Arc<dyn Renderer>, PipelineError> {
        match self {
            Self::Development(dev) => dev.resolve_renderer(url).await,
            Self::Production(prod) => Ok(prod.renderer()),
            Self::Test(fixed) => Ok(fixed.renderer()),
        }
    }

    /// Text logged for a failed request.
    ///
    /// In development the dev server rewrites traces to point at source.
    #[must_use]
    pub fn describe_error(&self, error: &PipelineError) -> String {
        match self {
            Self::Development(dev) => dev.fix_stacktrace(error),
            Self::Production(_) | Self::Test(_) => format!("{error:?}"),
        }
    }

    /// Routes that must be answered before the SSR handler.
    #[must_use]
    pub fn middleware(&self) -> Option<Router> {
        match self {
            Self::Development(dev) => dev.dev_server().middleware(),
            Self::Production(_) | Self::Test(_) => None,
        }
    }
}

impl AssetResolver for Strategy {
    fn resolve_client_entry(&self, name: &str) -> Option<ClientEntry> {
        match self {
            Self::Development(_) => DevAssets.resolve_client_entry(name),
            Self::Production(prod) => prod.assets().resolve_client_entry(name),
            Self::Test(fixed) => fixed.resolve_client_entry(name),
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.mode()).finish()
    }
}
