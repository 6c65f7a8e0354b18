//! Fixed strategy: renderer and template supplied by the caller.
//!
//! Used by tests and embedders that have no build step.

use ssr_pipeline_core::{AssetResolver, ClientEntry, DevAssets, ManifestAssets};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::renderer::Renderer;

/// Where the fixed strategy gets its template.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Template supplied at startup, used unchanged.
    Inline(String),
    /// Template read from disk on every request.
    File(PathBuf),
}

/// Resolution with a fixed renderer.
#[derive(Clone)]
pub struct FixedStrategy {
    template: TemplateSource,
    renderer: Arc<dyn Renderer>,
    manifest: Option<ManifestAssets>,
}

impl FixedStrategy {
    /// Create a fixed strategy. Client entries resolve like development.
    #[must_use]
    pub fn new(template: TemplateSource, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            template,
            renderer,
            manifest: None,
        }
    }

    /// Resolve client entries through a manifest instead.
    #[must_use]
    pub fn with_manifest(mut self, manifest: ManifestAssets) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub(crate) async fn resolve_template(&self) -> Result<String, PipelineError> {
        match &self.template {
            TemplateSource::Inline(template) => Ok(template.clone()),
            TemplateSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| PipelineError::Template {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }

    pub(crate) fn renderer(&self) -> Arc<dyn Renderer> {
        Arc::clone(&self.renderer)
    }
}

impl AssetResolver for FixedStrategy {
    fn resolve_client_entry(&self, name: &str) -> Option<ClientEntry> {
        match &self.manifest {
            Some(manifest) => manifest.resolve_client_entry(name),
            None => DevAssets.resolve_client_entry(name),
        }
    }
}
