//! Application state for the SSR handler.

use ssr_pipeline_runtime::Pipeline;
use std::sync::Arc;

/// Application state shared across all requests.
///
/// Built once at startup. Nothing in it is mutated while serving, so cloning
/// per request only bumps reference counts.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The render pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Scheme used when the request carries no `X-Forwarded-Proto`.
    pub default_scheme: Arc<str>,
    /// Host used when the request carries neither `X-Forwarded-Host` nor `Host`.
    pub default_host: Arc<str>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(pipeline: Pipeline, default_scheme: &str, default_host: &str) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_scheme: Arc::from(default_scheme),
            default_host: Arc::from(default_host),
        }
    }
}
