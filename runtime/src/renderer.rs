//! The page renderer seen by the pipeline.
//!
//! A renderer turns a fully-qualified request URL into markup plus metadata.
//! It is opaque to the pipeline; the only thing the pipeline hands it besides
//! the URL is an [`ApiClient`] bound to the request, which it must use for
//! backend calls whose cookies belong on the page response.

use async_trait::async_trait;
use ssr_pipeline_core::RenderResult;
use std::future::Future;
use std::sync::Arc;

use crate::client::ApiClient;

/// Input to one render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Fully-qualified URL of the inbound request.
    pub url: String,
    /// Client bound to this request's context.
    pub api: ApiClient,
}

/// Page renderer.
///
/// `Ok(None)` asks for the template to be served unmodified.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render the page for `request`.
    ///
    /// # Errors
    ///
    /// Any error is turned into a generic 500 by the pipeline.
    async fn render(&self, request: RenderRequest) -> anyhow::Result<Option<RenderResult>>;
}

/// Renderer backed by an async closure.
pub struct FnRenderer<F> {
    render: F,
}

#[async_trait]
impl<F, Fut> Renderer for FnRenderer<F>
where
    F: Fn(RenderRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<RenderResult>>> + Send + 'static,
{
    async fn render(&self, request: RenderRequest) -> anyhow::Result<Option<RenderResult>> {
        (self.render)(request).await
    }
}

/// Wrap an async closure as a shared renderer.
///
/// ```ignore
/// let renderer = renderer_fn(|request: RenderRequest| async move {
///     Ok(Some(RenderResult::new(format!("<main>{}</main>", request.url))))
/// });
/// ```
pub fn renderer_fn<F, Fut>(render: F) -> Arc<dyn Renderer>
where
    F: Fn(RenderRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<RenderResult>>> + Send + 'static,
{
    Arc::new(FnRenderer { render })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::ApiClientConfig;

    #[tokio::test]
    async fn test_closure_renderer_receives_url() {
        let renderer = renderer_fn(|request: RenderRequest| async move {
            Ok(Some(RenderResult::new(format!("<p>{}</p>", request.url))))
        });
        let api = ApiClient::new(ApiClientConfig::default()).unwrap();

        let result = renderer
            .render(RenderRequest {
                url: "http://localhost/a?b=1".to_string(),
                api,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.html, "<p>http://localhost/a?b=1</p>");
    }
}
