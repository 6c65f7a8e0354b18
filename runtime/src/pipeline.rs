//! One inbound request, from opened context to assembled document.
//!
//! ```text
//! context-open -> resolving -> rendering -> assembling -> (handler responds)
//!       \______________\____________\____________\-> error
//! ```
//!
//! The pipeline never writes a response itself. It hands the web layer a
//! [`PipelineOutcome`] holding the document (or the error) and everything the
//! request's nested calls captured.

use http::StatusCode;
use http::header::HeaderValue;
use ssr_pipeline_core::{CapturedEffects, Document, RequestContext, assemble};
use std::time::{Duration, Instant};

use crate::client::ApiClient;
use crate::error::PipelineError;
use crate::metrics;
use crate::renderer::RenderRequest;
use crate::strategy::Strategy;

/// Default bound on resolve + render + assemble.
pub const DEFAULT_RENDER_DEADLINE: Duration = Duration::from_secs(10);

/// Result of rendering one request.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The document, or why it could not be produced.
    pub result: Result<Document, PipelineError>,
    /// Cookies and headers captured while rendering.
    pub effects: CapturedEffects,
}

/// The request pipeline. Built once at startup and shared by all requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    strategy: Strategy,
    api: ApiClient,
    deadline: Option<Duration>,
}

impl Pipeline {
    /// Create a pipeline with the default render deadline.
    #[must_use]
    pub const fn new(strategy: Strategy, api: ApiClient) -> Self {
        Self {
            strategy,
            api,
            deadline: Some(DEFAULT_RENDER_DEADLINE),
        }
    }

    /// Override the render deadline (`None` disables it).
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Render deadline in use.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Render the page for the fully-qualified `url`.
    ///
    /// Opens a fresh context for this request only; the renderer's API client
    /// is bound to it and forwards `inbound_cookie` to the API origin.
    pub async fn render(&self, url: &str, inbound_cookie: Option<HeaderValue>) -> PipelineOutcome {
        self.render_with_id(url, inbound_cookie, None).await
    }

    /// [`Pipeline::render`], also passing `request_id` on to the API origin.
    pub async fn render_with_id(
        &self,
        url: &str,
        inbound_cookie: Option<HeaderValue>,
        request_id: Option<HeaderValue>,
    ) -> PipelineOutcome {
        let started = Instant::now();
        let context = RequestContext::new();
        let api = self
            .api
            .for_request(context.clone(), inbound_cookie)
            .with_request_id(request_id);

        let work = context.scope(self.run(url, api));
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, work)
                .await
                .unwrap_or_else(|_| {
                    Err(PipelineError::Timeout {
                        url: url.to_string(),
                        deadline,
                    })
                }),
            None => work.await,
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(document) => {
                metrics::record_render_duration(elapsed);
                tracing::debug!(
                    status = document.status,
                    elapsed_ms = elapsed.as_millis(),
                    "Page rendered"
                );
            }
            Err(error) => metrics::record_failure(error.stage()),
        }

        PipelineOutcome {
            result,
            effects: context.take(),
        }
    }

    async fn run(&self, url: &str, api: ApiClient) -> Result<Document, PipelineError> {
        let template = self.strategy.resolve_template(url).await?;
        let renderer = self.strategy.resolve_renderer(url).await?;

        let rendered = renderer
            .render(RenderRequest {
                url: url.to_string(),
                api,
            })
            .await
            .map_err(|source| PipelineError::Render {
                url: url.to_string(),
                source,
            })?;

        if let Some(status) = rendered.as_ref().and_then(|r| r.status) {
            StatusCode::from_u16(status).map_err(|_| PipelineError::InvalidStatus(status))?;
        }

        Ok(assemble(&template, rendered.as_ref(), &self.strategy))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::ApiClientConfig;
    use crate::renderer::renderer_fn;
    use crate::strategy::{FixedStrategy, TemplateSource};
    use ssr_pipeline_core::{RenderResult, current_context};

    const TEMPLATE: &str = "<html><head><!--app-head--></head><body><!--app-html--></body></html>";

    fn pipeline(renderer: std::sync::Arc<dyn crate::renderer::Renderer>) -> Pipeline {
        Pipeline::new(
            Strategy::Test(FixedStrategy::new(
                TemplateSource::Inline(TEMPLATE.to_string()),
                renderer,
            )),
            ApiClient::new(ApiClientConfig::default()).unwrap(),
        )
    }

    #[test]
    fn test_default_deadline() {
        let pipeline = pipeline(renderer_fn(|_| async { Ok(None) }));
        assert_eq!(pipeline.deadline(), Some(DEFAULT_RENDER_DEADLINE));
        assert_eq!(pipeline.with_deadline(None).deadline(), None);
    }

    #[tokio::test]
    async fn test_null_result_serves_template() {
        let outcome = pipeline(renderer_fn(|_| async { Ok(None) }))
            .render("http://localhost/", None)
            .await;
        let document = outcome.result.unwrap();
        assert_eq!(document.html, TEMPLATE);
        assert_eq!(document.status, 200);
    }

    #[tokio::test]
    async fn test_effects_captured_even_for_null_result() {
        let renderer = renderer_fn(|request: RenderRequest| async move {
            request.api.context().unwrap().push_cookie("session=abc");
            Ok(None)
        });
        let outcome = pipeline(renderer).render("http://localhost/", None).await;
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.effects.cookies, vec!["session=abc".to_string()]);
    }

    #[tokio::test]
    async fn test_renderer_runs_inside_request_context() {
        let renderer = renderer_fn(|request: RenderRequest| async move {
            let current = current_context().unwrap();
            assert!(current.same_request(&request.api.context().unwrap()));
            current.set_header("x-csrf-token", "t1");
            Ok(Some(RenderResult::new("<p>ok</p>")))
        });
        let outcome = pipeline(renderer).render("http://localhost/", None).await;
        assert!(outcome.result.unwrap().html.contains("<p>ok</p>"));
        assert_eq!(outcome.effects.headers.get("x-csrf-token").unwrap(), "t1");
    }

    #[tokio::test]
    async fn test_renderer_error_is_render_stage() {
        let outcome = pipeline(renderer_fn(|_| async { Err(anyhow::anyhow!("db down")) }))
            .render("http://localhost/", None)
            .await;
        let err = outcome.result.unwrap_err();
        assert_eq!(err.stage(), "render");
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let renderer =
            renderer_fn(|_| async { Ok(Some(RenderResult::new("x").with_status(1200))) });
        let outcome = pipeline(renderer).render("http://localhost/", None).await;
        assert!(matches!(
            outcome.result.unwrap_err(),
            PipelineError::InvalidStatus(1200)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let renderer = renderer_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        });
        let pipeline = pipeline(renderer).with_deadline(Some(Duration::from_millis(100)));
        assert_eq!(pipeline.deadline(), Some(Duration::from_millis(100)));

        let outcome = pipeline.render("http://localhost/slow", None).await;
        assert!(matches!(
            outcome.result.unwrap_err(),
            PipelineError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_renders_are_isolated() {
        let renderer = renderer_fn(|request: RenderRequest| async move {
            let who = request.url.rsplit('/').next().unwrap_or_default().to_string();
            tokio::task::yield_now().await;
            request.api.context().unwrap().push_cookie(format!("user={who}"));
            tokio::task::yield_now().await;
            Ok(None)
        });
        let pipeline = pipeline(renderer);

        let (a, b) = tokio::join!(
            pipeline.render("http://localhost/alice", None),
            pipeline.render("http://localhost/bob", None)
        );
        assert_eq!(a.effects.cookies, vec!["user=alice".to_string()]);
        assert_eq!(b.effects.cookies, vec!["user=bob".to_string()]);
    }
}
