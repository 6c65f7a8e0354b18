//! Blog served through the SSR pipeline.
//!
//! Pages fetch posts from the API at `SSR_API_BASE_URL`; any session cookie the
//! API sets ends up on the page response. Without an API the blog renders an
//! empty list.
//!
//! ```text
//! SSR_MODE=development SSR_TEMPLATE_PATH=demos/blog/index.html \
//!   SSR_SOURCE_ROOT=demos/blog cargo run -p ssr-blog-demo
//! ```

mod pages;

use ssr_pipeline_web::{Config, serve, strategy_for};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssr_blog=info,ssr_pipeline_web=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        mode = %config.mode,
        template = %config.paths.template.display(),
        api = config.api.base_url.as_ref().map_or("-", |u| u.as_str()),
        "Configuration loaded"
    );

    let strategy = strategy_for(&config, pages::renderer())?;
    serve(config, strategy).await
}
