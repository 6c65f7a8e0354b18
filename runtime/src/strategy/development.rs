//! Development strategy: template and renderer come from a dev server.
//!
//! The template is re-read from disk and transformed for every request, and
//! the renderer is fetched per request so edits show up without a restart.

use async_trait::async_trait;
use axum::Router;
use axum::http::header;
use axum::routing::get;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tower_http::services::ServeDir;

use crate::error::PipelineError;
use crate::renderer::Renderer;

/// Bundler-backed development server.
#[async_trait]
pub trait DevServer: Send + Sync {
    /// Transform the source template for `url` (inject client tags, rewrite paths).
    ///
    /// # Errors
    ///
    /// Returns an error if the transform fails; the request is answered with a 500.
    async fn transform_index_html(&self, url: &str, html: String) -> anyhow::Result<String>;

    /// Load the current renderer for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page module cannot be loaded.
    async fn load_renderer(&self, url: &str) -> anyhow::Result<Arc<dyn Renderer>>;

    /// Render `error` with a trace that points at source rather than build output.
    fn fix_stacktrace(&self, error: &anyhow::Error) -> String {
        format!("{error:?}")
    }

    /// Routes the dev server answers before the SSR handler (module requests etc).
    fn middleware(&self) -> Option<Router> {
        None
    }
}

/// Template and renderer resolution through a [`DevServer`].
#[derive(Clone)]
pub struct DevelopmentStrategy {
    template_path: PathBuf,
    dev_server: Arc<dyn DevServer>,
}

impl DevelopmentStrategy {
    /// Create a development strategy reading the source template at `template_path`.
    #[must_use]
    pub fn new(template_path: impl Into<PathBuf>, dev_server: Arc<dyn DevServer>) -> Self {
        Self {
            template_path: template_path.into(),
            dev_server,
        }
    }

    /// The dev server in use.
    #[must_use]
    pub fn dev_server(&self) -> &Arc<dyn DevServer> {
        &self.dev_server
    }

    pub(crate) async fn resolve_template(&self, url: &str) -> Result<String, PipelineError> {
        let html = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| PipelineError::Template {
                path: self.template_path.clone(),
                source,
            })?;
        self.dev_server
            .transform_index_html(url, html)
            .await
            .map_err(|source| PipelineError::Transform {
                url: url.to_string(),
                source,
            })
    }

    pub(crate) async fn resolve_renderer(
        &self,
        url: &str,
    ) -> Result<Arc<dyn Renderer>, PipelineError> {
        self.dev_server
            .load_renderer(url)
            .await
            .map_err(|source| PipelineError::RendererResolution {
                url: url.to_string(),
                source,
            })
    }

    pub(crate) fn fix_stacktrace(&self, error: &PipelineError) -> String {
        match error.application_error() {
            Some(source) => format!("{error}\n{}", self.dev_server.fix_stacktrace(source)),
            None => format!("{error:?}"),
        }
    }
}

/// Module path of the hot-reload client injected by [`LocalDevServer`].
pub const DEFAULT_HMR_CLIENT: &str = "/@hmr/client";

/// How often the hot-reload client polls for a new generation.
const HMR_POLL_INTERVAL_MS: u64 = 1000;

/// In-process dev server with a hot-swappable renderer.
///
/// A file watcher (or test) calls [`LocalDevServer::reload`] after rebuilding
/// the page module; the next request picks up the new renderer. Source modules
/// under `<root>/src` are served as-is so dev asset paths resolve.
///
/// The injected client module polls `<client>/generation` and reloads the page
/// when the number changes.
pub struct LocalDevServer {
    renderer: RwLock<Arc<dyn Renderer>>,
    generation: Arc<AtomicU64>,
    root: PathBuf,
    hmr_client: String,
}

impl LocalDevServer {
    /// Create a dev server serving sources below `root`.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, root: impl Into<PathBuf>) -> Self {
        Self {
            renderer: RwLock::new(renderer),
            generation: Arc::new(AtomicU64::new(0)),
            root: root.into(),
            hmr_client: DEFAULT_HMR_CLIENT.to_string(),
        }
    }

    /// Serve the hot-reload client at a different path.
    ///
    /// The path is a plain route (no `:` or `*` segments); a missing leading
    /// slash is added.
    #[must_use]
    pub fn with_hmr_client(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.hmr_client = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Path the hot-reload client is served at.
    #[must_use]
    pub fn hmr_client(&self) -> &str {
        &self.hmr_client
    }

    /// Swap in a freshly built renderer.
    pub async fn reload(&self, renderer: Arc<dyn Renderer>) {
        *self.renderer.write().await = renderer;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "Renderer reloaded");
    }

    /// Number of reloads so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Directory sources are served from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DevServer for LocalDevServer {
    async fn transform_index_html(&self, _url: &str, html: String) -> anyhow::Result<String> {
        let tag = format!(r#"<script type="module" src="{}"></script>"#, self.hmr_client);
        Ok(inject_after_head_open(&html, &tag))
    }

    async fn load_renderer(&self, _url: &str) -> anyhow::Result<Arc<dyn Renderer>> {
        Ok(Arc::clone(&*self.renderer.read().await))
    }

    fn middleware(&self) -> Option<Router> {
        let module = hmr_client_module(&self.hmr_client);
        let generation = Arc::clone(&self.generation);
        let router = Router::new()
            .route(
                &self.hmr_client,
                get(move || async move {
                    (
                        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
                        module,
                    )
                }),
            )
            .route(
                &format!("{}/generation", self.hmr_client),
                get(move || async move {
                    (
                        [
                            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                            (header::CACHE_CONTROL, "no-store"),
                        ],
                        generation.load(Ordering::SeqCst).to_string(),
                    )
                }),
            )
            .nest_service("/src", ServeDir::new(self.root.join("src")));
        Some(router)
    }
}

fn hmr_client_module(client_path: &str) -> String {
    format!(
        r#"const endpoint = "{endpoint}/generation";
let current = null;

async function poll() {{
  try {{
    const response = await fetch(endpoint, {{ cache: "no-store" }});
    const generation = await response.text();
    if (current !== null && generation !== current) {{
      location.reload();
      return;
    }}
    current = generation;
  }} catch (_) {{
    // server restarting
  }}
  setTimeout(poll, {interval});
}}

poll();
"#,
        endpoint = client_path.escape_default(),
        interval = HMR_POLL_INTERVAL_MS,
    )
}

fn inject_after_head_open(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let head_end = lower.find("<head").and_then(|start| {
        lower[start..]
            .find('>')
            .map(|offset| start + offset + 1)
    });
    match head_end {
        Some(at) => format!("{}{tag}{}", &html[..at], &html[at..]),
        None => format!("{tag}{html}"),
    }
}
