//! Stub API backend.

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::header::{COOKIE, HeaderName, HeaderValue, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode, Uri};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Canned response for one path.
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    body: serde_json::Value,
    cookies: Vec<String>,
    headers: Vec<(String, String)>,
    delay: Option<Duration>,
}

impl StubResponse {
    /// 200 with a JSON body.
    #[must_use]
    pub const fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body,
            cookies: Vec::new(),
            headers: Vec::new(),
            delay: None,
        }
    }

    /// Respond with `status` instead.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a `Set-Cookie` header (repeatable).
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Add any other response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Wait before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn to_response(&self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, axum::Json(self.body.clone())).into_response();
        let headers = response.headers_mut();
        for cookie in &self.cookies {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.append(SET_COOKIE, value);
            }
        }
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        response
    }
}

/// A request the stub backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Path and query.
    pub path: String,
    /// Inbound `Cookie` header, if any.
    pub cookie: Option<String>,
    /// Inbound `X-Request-ID` header, if any.
    pub request_id: Option<String>,
}

struct Inner {
    routes: HashMap<String, StubResponse>,
    hits: Mutex<Vec<RecordedRequest>>,
}

/// HTTP backend on `127.0.0.1:<ephemeral>` answering with canned responses.
///
/// Unknown paths get a 404. The server shuts down when the handle is dropped.
pub struct StubBackend {
    addr: SocketAddr,
    inner: Arc<Inner>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubBackend {
    /// Bind and start serving `routes`, keyed by path (query ignored).
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start<'a>(
        routes: impl IntoIterator<Item = (&'a str, StubResponse)>,
    ) -> std::io::Result<Self> {
        let inner = Arc::new(Inner {
            routes: routes
                .into_iter()
                .map(|(path, response)| (path.to_string(), response))
                .collect(),
            hits: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(answer)
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            addr,
            inner,
            shutdown: Some(shutdown_tx),
        })
    }

    /// Bound address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://127.0.0.1:<port>/`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn hits(&self) -> Vec<RecordedRequest> {
        self.inner
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn answer(
    State(inner): State<Arc<Inner>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    inner
        .hits
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedRequest {
            method,
            path: uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), ToString::to_string),
            cookie: header_string(&headers, COOKIE.as_str()),
            request_id: header_string(&headers, "x-request-id"),
        });

    let Some(stub) = inner.routes.get(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(delay) = stub.delay {
        tokio::time::sleep(delay).await;
    }
    stub.to_response()
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
