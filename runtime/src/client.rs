//! HTTP client for nested backend calls made while rendering.
//!
//! Renderers receive an [`ApiClient`] bound to the request they are rendering.
//! Every response it receives is passed through the [`Interceptor`], so cookies
//! and anti-forgery tokens set by the backend end up on the page response
//! without the renderer handling them:
//!
//! ```ignore
//! let posts: Vec<Post> = request
//!     .api
//!     .get("/api/posts")
//!     .query(&[("page", page)])
//!     .send_json()
//!     .await?;
//! ```
//!
//! The underlying `reqwest::Client` and interceptor are built once at startup;
//! [`ApiClient::for_request`] only clones handles.

use std::sync::Arc;
use std::time::Duration;

use http::header::{COOKIE, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ssr_pipeline_core::{RequestContext, current_context};

use crate::error::ApiError;
use crate::interceptor::{DEFAULT_CSRF_HEADER, Interceptor};
use crate::metrics;

/// Header carrying the inbound request's ID on calls to the API origin.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Settings for the API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL relative paths are resolved against.
    pub base_url: Option<Url>,
    /// Timeout for each outbound call (`None` = no timeout).
    pub timeout: Option<Duration>,
    /// Forward the inbound `Cookie` header to the API origin.
    pub forward_cookies: bool,
    /// Anti-forgery header to capture from responses.
    pub csrf_header: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Some(Duration::from_secs(5)),
            forward_cookies: true,
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    base_url: Option<Url>,
    forward_cookies: bool,
    interceptor: Interceptor,
}

/// Intercepting HTTP client for backend calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    shared: Arc<Shared>,
    context: Option<RequestContext>,
    inbound_cookie: Option<HeaderValue>,
    request_id: Option<HeaderValue>,
}

impl ApiClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_http_client(builder.build()?, config))
    }

    /// Wrap an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, config: ApiClientConfig) -> Self {
        Self {
            http,
            shared: Arc::new(Shared {
                base_url: config.base_url,
                forward_cookies: config.forward_cookies,
                interceptor: Interceptor::new(config.csrf_header),
            }),
            context: None,
            inbound_cookie: None,
            request_id: None,
        }
    }

    /// Client bound to one inbound request.
    ///
    /// Responses are captured into `context`; `inbound_cookie` is forwarded to
    /// the API origin when cookie forwarding is enabled.
    #[must_use]
    pub fn for_request(&self, context: RequestContext, inbound_cookie: Option<HeaderValue>) -> Self {
        Self {
            http: self.http.clone(),
            shared: Arc::clone(&self.shared),
            context: Some(context),
            inbound_cookie,
            request_id: None,
        }
    }

    /// Send `request_id` as `X-Request-ID` on calls to the API origin.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<HeaderValue>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Context responses are captured into: the bound one, else the current one.
    #[must_use]
    pub fn context(&self) -> Option<RequestContext> {
        self.context.clone().or_else(current_context)
    }

    /// Configured API base URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.shared.base_url.as_ref()
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, path: &str) -> ApiRequest {
        self.request(Method::POST, path)
    }

    /// Start a PUT request.
    #[must_use]
    pub fn put(&self, path: &str) -> ApiRequest {
        self.request(Method::PUT, path)
    }

    /// Start a PATCH request.
    #[must_use]
    pub fn patch(&self, path: &str) -> ApiRequest {
        self.request(Method::PATCH, path)
    }

    /// Start a DELETE request.
    #[must_use]
    pub fn delete(&self, path: &str) -> ApiRequest {
        self.request(Method::DELETE, path)
    }

    /// Start a request with an arbitrary method.
    ///
    /// `path` is either an absolute `http(s)://` URL or a path relative to the
    /// API base URL.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        let builder = self.resolve(path).map(|url| {
            let cookie = self.forwarded_cookie(&url).cloned();
            let request_id = self
                .request_id
                .clone()
                .filter(|_| self.is_api_origin(&url));
            let mut builder = self.http.request(method, url);
            if let Some(cookie) = cookie {
                builder = builder.header(COOKIE, cookie);
            }
            if let Some(request_id) = request_id {
                builder = builder.header(REQUEST_ID_HEADER, request_id);
            }
            builder
        });
        ApiRequest {
            client: self.clone(),
            builder,
        }
    }

    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::InvalidUrl {
                url: path.to_string(),
                message: e.to_string(),
            });
        }
        let base = self
            .shared
            .base_url
            .as_ref()
            .ok_or_else(|| ApiError::NoBaseUrl(path.to_string()))?;
        base.join(path).map_err(|e| ApiError::InvalidUrl {
            url: path.to_string(),
            message: e.to_string(),
        })
    }

    fn is_api_origin(&self, url: &Url) -> bool {
        self.shared
            .base_url
            .as_ref()
            .is_some_and(|base| base.origin() == url.origin())
    }

    fn forwarded_cookie(&self, url: &Url) -> Option<&HeaderValue> {
        if !self.shared.forward_cookies || !self.is_api_origin(url) {
            return None;
        }
        self.inbound_cookie.as_ref()
    }

    fn capture(&self, response: &reqwest::Response) {
        let Some(context) = self.context() else {
            return;
        };
        let added = self.shared.interceptor.capture(response.headers(), &context);
        if added > 0 {
            metrics::record_captured_cookies(added);
            tracing::debug!(cookies = added, url = %response.url(), "Captured session cookies");
        }
    }
}

/// Outbound request being built; see [`ApiClient::request`].
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest {
    client: ApiClient,
    builder: Result<reqwest::RequestBuilder, ApiError>,
}

impl ApiRequest {
    /// Add a request header.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.builder = self.builder.map(|b| b.header(key, value));
        self
    }

    /// Append query parameters.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.builder = self.builder.map(|b| b.query(query));
        self
    }

    /// Send `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.map(|b| b.json(body));
        self
    }

    /// Send a raw body.
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.builder = self.builder.map(|b| b.body(body));
        self
    }

    /// Send the request.
    ///
    /// Side effects are captured from any response, including error statuses.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request is invalid or cannot be sent.
    pub async fn send(self) -> Result<reqwest::Response, ApiError> {
        let response = self.builder?.send().await?;
        self.client.capture(&response);
        Ok(response)
    }

    /// Send the request and decode a successful JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for non-2xx responses, otherwise as [`ApiRequest::send`].
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let response = self.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.json().await?)
    }
}
