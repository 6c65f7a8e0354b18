//! Error responses for the SSR handler.
//!
//! Clients only ever see a generic plain-text body. The detail (error chain,
//! rewritten stack trace) goes to the log.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

/// Body sent for every failed render.
pub const GENERIC_ERROR_BODY: &str = "Internal Server Error";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// match outcome.result {
///     Ok(document) => Ok(document_response(document, &outcome.effects)),
///     Err(error) => Err(AppError::render_failed(error.stage(), &url, detail)),
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Failing pipeline stage, if any
    stage: Option<&'static str>,
    /// Request URL, if known
    url: Option<String>,
    /// Internal detail (logged, never sent)
    detail: Option<String>,
}

impl AppError {
    /// Create a 500 Internal Server Error.
    #[must_use]
    pub const fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            stage: None,
            url: None,
            detail: None,
        }
    }

    /// A render of `url` failed in `stage`.
    #[must_use]
    pub fn render_failed(stage: &'static str, url: &str, detail: String) -> Self {
        Self {
            stage: Some(stage),
            url: Some(url.to_string()),
            detail: Some(detail),
            ..Self::internal()
        }
    }

    /// HTTP status this error responds with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Internal detail that will be logged.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stage, &self.url) {
            (Some(stage), Some(url)) => write!(f, "{} while rendering {url} ({stage})", self.status),
            _ => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                stage = self.stage.unwrap_or("unknown"),
                url = self.url.as_deref().unwrap_or(""),
                error = self.detail.as_deref().unwrap_or(""),
                "Render failed"
            );
        }

        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            GENERIC_ERROR_BODY,
        )
            .into_response()
    }
}
