//! Router assembly.
//!
//! ```text
//! request-id -> trace -> [mode middleware] -> render_page
//! ```
//!
//! Production puts a compressing static-file server for the client build in
//! front of the handler; development puts the dev server's routes there.

use axum::Router;
use ssr_pipeline_runtime::Strategy;
use std::path::PathBuf;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::render_page;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Build the application router.
///
/// `static_dir` is only used in production; requests for files that do not
/// exist there (and every non-GET request) fall through to the SSR handler.
#[must_use]
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let strategy = state.pipeline.strategy().clone();
    let ssr = Router::new().fallback(render_page).with_state(state);

    let app = match (&strategy, static_dir) {
        (Strategy::Production(_), Some(dir)) => {
            let assets = ServeDir::new(dir)
                .append_index_html_on_directories(false)
                .call_fallback_on_method_not_allowed(true)
                .fallback(ssr);
            Router::new()
                .fallback_service(assets)
                .layer(CompressionLayer::new())
        }
        _ => match strategy.middleware() {
            Some(dev) => dev.merge(ssr),
            None => ssr,
        },
    };

    app.layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
