//! Custom Axum extractors.
//!
//! - `RequestOrigin`: the fully-qualified URL the client asked for, plus the
//!   inbound `Cookie` header and request ID to forward to the API
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>, origin: RequestOrigin) -> Response {
//!     let outcome = state
//!         .pipeline
//!         .render_with_id(&origin.url, origin.cookie, origin.request_id)
//!         .await;
//!     ...
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, Uri, header, request::Parts},
};

use crate::middleware::RequestId;
use crate::state::AppState;

/// Public URL and cookies of the inbound request.
///
/// # Priority
///
/// Scheme:
/// 1. `X-Forwarded-Proto` (first value)
/// 2. Configured default scheme
///
/// Host:
/// 1. `X-Forwarded-Host` (first value)
/// 2. `Host`
/// 3. Bind address
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    /// Fully-qualified request URL, e.g. `https://example.com/dev-blog?Page=2`
    pub url: String,
    /// Inbound `Cookie` header
    pub cookie: Option<HeaderValue>,
    /// ID assigned by the request-ID layer, if it ran
    pub request_id: Option<HeaderValue>,
}

impl RequestOrigin {
    /// Build the origin from raw request parts.
    #[must_use]
    pub fn from_parts(headers: &HeaderMap, uri: &Uri, default_scheme: &str, default_host: &str) -> Self {
        let scheme = first_value(headers, "x-forwarded-proto").unwrap_or(default_scheme);
        let host = first_value(headers, "x-forwarded-host")
            .or_else(|| first_value(headers, header::HOST.as_str()))
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or(default_host);
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());

        Self {
            url: format!("{scheme}://{host}{path}"),
            cookie: headers.get(header::COOKIE).cloned(),
            request_id: None,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut origin = Self::from_parts(
            &parts.headers,
            &parts.uri,
            &state.default_scheme,
            &state.default_host,
        );
        origin.request_id = parts
            .extensions
            .get::<RequestId>()
            .and_then(RequestId::header_value);
        Ok(origin)
    }
}

/// First comma-separated value of `name`, trimmed, if non-empty.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
