//! Capture of session side effects from outbound responses.
//!
//! Every response that comes back through [`ApiClient`](crate::client::ApiClient)
//! is offered to the [`Interceptor`], which copies `Set-Cookie` values and the
//! anti-forgery header into the request's [`RequestContext`]. Capture is best
//! effort: a header that cannot be read is skipped and never fails the call.

use http::HeaderMap;
use http::header::SET_COOKIE;
use ssr_pipeline_core::RequestContext;

/// Header name the backend uses for its anti-forgery token by default.
pub const DEFAULT_CSRF_HEADER: &str = "x-csrf-token";

/// Copies cookies and the anti-forgery header from responses into a context.
#[derive(Debug, Clone)]
pub struct Interceptor {
    csrf_header: String,
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new(DEFAULT_CSRF_HEADER)
    }
}

impl Interceptor {
    /// Create an interceptor looking for `csrf_header` (matched case-insensitively).
    #[must_use]
    pub fn new(csrf_header: impl Into<String>) -> Self {
        Self {
            csrf_header: csrf_header.into().to_ascii_lowercase(),
        }
    }

    /// Configured anti-forgery header name, lowercased.
    #[must_use]
    pub fn csrf_header(&self) -> &str {
        &self.csrf_header
    }

    /// Capture side effects of one response into `context`.
    ///
    /// Returns the number of cookies that were new to the context.
    pub fn capture(&self, headers: &HeaderMap, context: &RequestContext) -> usize {
        let mut added = 0;
        for value in headers.get_all(SET_COOKIE) {
            if let Ok(cookie) = value.to_str() {
                if context.push_cookie(cookie) {
                    added += 1;
                }
            }
        }

        if let Some((name, value)) = self.find_csrf(headers) {
            context.set_header(name, value);
        }

        added
    }

    fn find_csrf(&self, headers: &HeaderMap) -> Option<(String, String)> {
        if let Some(value) = headers
            .get(self.csrf_header.as_str())
            .and_then(|v| v.to_str().ok())
        {
            return Some((self.csrf_header.clone(), value.to_string()));
        }

        // HeaderName is always lowercase, so a plain substring match is case-insensitive.
        headers
            .iter()
            .filter(|(name, _)| name.as_str().contains("csrf"))
            .find_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &[u8])]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_bytes(value).unwrap());
        }
        map
    }

    #[test]
    fn test_captures_every_set_cookie() {
        let context = RequestContext::new();
        let response = headers(&[
            ("set-cookie", b"session=abc; Path=/; HttpOnly"),
            ("set-cookie", b"theme=dark"),
        ]);

        assert_eq!(Interceptor::default().capture(&response, &context), 2);
        assert_eq!(
            context.snapshot().cookies,
            vec!["session=abc; Path=/; HttpOnly", "theme=dark"]
        );
    }

    #[test]
    fn test_duplicate_cookies_across_calls() {
        let context = RequestContext::new();
        let interceptor = Interceptor::default();
        let response = headers(&[("set-cookie", b"session=abc")]);

        assert_eq!(interceptor.capture(&response, &context), 1);
        assert_eq!(interceptor.capture(&response, &context), 0);
        assert_eq!(context.snapshot().cookies.len(), 1);
    }

    #[test]
    fn test_configured_csrf_header_case_insensitive() {
        let context = RequestContext::new();
        let response = headers(&[("x-xsrf-token", b"tok-1"), ("x-csrf-other", b"nope")]);

        let interceptor = Interceptor::new("X-XSRF-Token");
        assert_eq!(interceptor.csrf_header(), "x-xsrf-token");

        interceptor.capture(&response, &context);
        let effects = context.snapshot();
        assert_eq!(effects.headers.len(), 1);
        assert_eq!(effects.headers["x-xsrf-token"], "tok-1");
    }

    #[test]
    fn test_falls_back_to_any_csrf_header() {
        let context = RequestContext::new();
        let response = headers(&[("content-type", b"application/json"), ("anti-csrf", b"tok-2")]);

        Interceptor::default().capture(&response, &context);
        assert_eq!(context.snapshot().headers["anti-csrf"], "tok-2");
    }

    #[test]
    fn test_unreadable_values_are_skipped() {
        let context = RequestContext::new();
        let response = headers(&[
            ("set-cookie", b"bad=\xff\xfe"),
            ("set-cookie", b"good=1"),
            ("x-csrf-token", b"\xff"),
        ]);

        assert_eq!(Interceptor::default().capture(&response, &context), 1);
        let effects = context.snapshot();
        assert_eq!(effects.cookies, vec!["good=1"]);
        assert!(effects.headers.is_empty());
    }

    #[test]
    fn test_no_side_effects_captures_nothing() {
        let context = RequestContext::new();
        let response = headers(&[("content-type", b"text/plain")]);
        assert_eq!(Interceptor::default().capture(&response, &context), 0);
        assert!(context.snapshot().is_empty());
    }
}
