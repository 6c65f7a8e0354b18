//! Axum integration for the SSR pipeline.
//!
//! # Request Flow
//!
//! 1. **Request ID** assigned and a tracing span opened
//! 2. **Mode middleware** (static build output or dev server) gets first pick
//! 3. **`render_page`** builds the public URL, runs the pipeline in a fresh
//!    request context and applies captured cookies and headers
//! 4. **Failures** become a generic 500 with the detail logged
//!
//! # Example
//!
//! ```ignore
//! use ssr_pipeline_web::{Config, serve, strategy_for};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let strategy = strategy_for(&config, my_renderer())?;
//!     serve(config, strategy).await
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use error::AppError;
pub use extractors::RequestOrigin;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use router::build_router;
pub use state::AppState;

use anyhow::Context as _;
use ssr_pipeline_core::Mode;
use ssr_pipeline_runtime::strategy::{
    DevelopmentStrategy, FixedStrategy, LocalDevServer, ProductionStrategy, TemplateSource,
};
use ssr_pipeline_runtime::{ApiClient, ApiError, Pipeline, PipelineError, Renderer, Strategy, metrics};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Pick the strategy for `config.mode`.
///
/// Development wraps `renderer` in a [`LocalDevServer`]; production loads the
/// built template and manifest now.
///
/// # Errors
///
/// Returns [`PipelineError::Template`] if the production template cannot be read.
pub fn strategy_for(config: &Config, renderer: Arc<dyn Renderer>) -> Result<Strategy, PipelineError> {
    Ok(match config.mode {
        Mode::Development => Strategy::Development(DevelopmentStrategy::new(
            &config.paths.template,
            Arc::new(LocalDevServer::new(renderer, &config.paths.source_root)),
        )),
        Mode::Production => Strategy::Production(ProductionStrategy::load(
            &config.paths.template,
            &config.paths.manifest,
            renderer,
        )?),
        Mode::Test => Strategy::Test(FixedStrategy::new(
            TemplateSource::File(config.paths.template.clone()),
            renderer,
        )),
    })
}

/// Build the router for `config` without binding a listener.
///
/// # Errors
///
/// Returns [`ApiError::Transport`] if the API client cannot be constructed.
pub fn app(config: &Config, strategy: Strategy) -> Result<axum::Router, ApiError> {
    let api = ApiClient::new(config.api_client_config())?;
    let pipeline = Pipeline::new(strategy, api).with_deadline(config.render_timeout);
    let state = AppState::new(pipeline, &config.server.scheme, &config.bind_addr());
    Ok(build_router(state, Some(config.paths.static_dir.clone())))
}

/// Bind and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the API client cannot be built, the listener cannot be
/// bound, or the server fails.
pub async fn serve(config: Config, strategy: Strategy) -> anyhow::Result<()> {
    metrics::describe();
    let router = app(&config, strategy)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, mode = %config.mode, "SSR server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("SSR server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
