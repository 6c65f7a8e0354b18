//! Axum middleware for request tracking.
//!
//! # Flow
//!
//! 1. **Extract** the request ID from `X-Request-ID` (or generate a UUID)
//! 2. **Store** it in request extensions, where [`RequestOrigin`] picks it up
//!    so nested API calls carry the same ID
//! 3. **Run** the request inside an `ssr_request` tracing span, which records
//!    the response status once the handler is done
//! 4. **Echo** the ID on the response
//!
//! [`RequestOrigin`]: crate::extractors::RequestOrigin
//!
//! # Example
//!
//! ```ignore
//! let app = Router::new()
//!     .fallback(render_page)
//!     .layer(request_id_layer());
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

pub use ssr_pipeline_runtime::REQUEST_ID_HEADER;

/// Longest inbound request ID that is reused as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// ID of the request being served, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the caller's ID when it is usable, else mint a UUID v4.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let inbound = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN);
        Self(inbound.map_or_else(|| Uuid::new_v4().to_string(), str::to_string))
    }

    /// The ID as a header value.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

/// Create a layer that assigns every request an ID.
#[must_use]
pub const fn request_id_layer() -> RequestIdLayer {
    RequestIdLayer
}

/// Layer for request ID tracking.
#[derive(Clone, Debug)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Middleware service for request ID tracking.
#[derive(Clone, Debug)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for RequestIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let request_id = RequestId::from_headers(req.headers());
        let echo = request_id.header_value();
        let span = tracing::info_span!(
            "ssr_request",
            request_id = %request_id.0,
            method = %req.method(),
            uri = %req.uri(),
            status = tracing::field::Empty,
        );
        req.extensions_mut().insert(request_id);

        let fut = self.inner.call(req).instrument(span.clone());

        Box::pin(async move {
            let mut response = fut.await?;
            span.record("status", response.status().as_u16());

            if let Some(value) = echo {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{Extension, Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/test",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(request_id_layer())
    }

    #[tokio::test]
    async fn test_request_id_generated_if_missing() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("Request ID header should be present");
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_preserved_from_request() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Request-ID", "edge-7f3a")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "edge-7f3a");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"edge-7f3a");
    }

    #[test]
    fn test_request_id_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  lb-42  "));
        assert_eq!(RequestId::from_headers(&headers), RequestId("lb-42".to_string()));

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        let minted = RequestId::from_headers(&headers);
        assert!(Uuid::parse_str(&minted.0).is_ok());
        assert_eq!(minted.header_value().unwrap(), minted.0.as_str());
    }

    #[tokio::test]
    async fn test_span_records_response_status() {
        let (logs, _guard) = ssr_pipeline_testing::logs::capture_logs();
        let app = Router::new()
            .route(
                "/missing",
                get(|| async {
                    tracing::info!("handling");
                    axum::http::StatusCode::NOT_FOUND
                }),
            )
            .layer(request_id_layer());

        let request = Request::builder()
            .uri("/missing")
            .header("X-Request-ID", "trace-me")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(logs.contains("request_id=trace-me"));
        assert!(logs.contains("status=404"));
    }

    #[tokio::test]
    async fn test_oversized_request_id_replaced() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Request-ID", "x".repeat(500))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }
}
