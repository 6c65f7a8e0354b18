//! Production strategy: built template, manifest and server entry, loaded once.

use ssr_pipeline_core::ManifestAssets;
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::renderer::Renderer;

/// Resolution against the build output.
///
/// Everything is read at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct ProductionStrategy {
    template: Arc<str>,
    assets: ManifestAssets,
    renderer: Arc<dyn Renderer>,
}

impl ProductionStrategy {
    /// Assemble from already loaded parts.
    #[must_use]
    pub fn new(template: impl Into<Arc<str>>, assets: ManifestAssets, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            template: template.into(),
            assets,
            renderer,
        }
    }

    /// Read the built template and manifest from disk.
    ///
    /// `server_entry` is the compiled-in page renderer of the build.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Template`] if the template cannot be read. A
    /// missing or broken manifest is only logged.
    pub fn load(
        template_path: &Path,
        manifest_path: &Path,
        server_entry: Arc<dyn Renderer>,
    ) -> Result<Self, PipelineError> {
        let template =
            std::fs::read_to_string(template_path).map_err(|source| PipelineError::Template {
                path: template_path.to_path_buf(),
                source,
            })?;
        let assets = ManifestAssets::load_or_warn(manifest_path);
        tracing::info!(
            template = %template_path.display(),
            manifest_loaded = assets.is_loaded(),
            "Production build loaded"
        );
        Ok(Self::new(template, assets, server_entry))
    }

    /// Cached template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Manifest-backed asset resolver.
    #[must_use]
    pub const fn assets(&self) -> &ManifestAssets {
        &self.assets
    }

    /// The server entry renderer.
    #[must_use]
    pub fn renderer(&self) -> Arc<dyn Renderer> {
        Arc::clone(&self.renderer)
    }
}
