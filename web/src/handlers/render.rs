//! The catch-all SSR handler.
//!
//! Every method and path that no middleware answered ends up here. The handler
//! runs the pipeline and turns its outcome into a response:
//!
//! - success: status and headers from the document, captured headers, one
//!   `Set-Cookie` per captured cookie, HTML body
//! - failure: generic 500, detail logged (see [`AppError`])

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use ssr_pipeline_core::{CapturedEffects, Document};
use ssr_pipeline_runtime::metrics;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::extractors::RequestOrigin;
use crate::state::AppState;

/// Render the page for the inbound request.
///
/// # Errors
///
/// Returns [`AppError`] (a generic 500) if any pipeline stage fails.
pub async fn render_page(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> Result<Response, AppError> {
    let outcome = state
        .pipeline
        .render_with_id(&origin.url, origin.cookie, origin.request_id)
        .await;

    match outcome.result {
        Ok(document) => {
            metrics::record_request(document.status);
            Ok(document_response(document, &outcome.effects))
        }
        Err(error) => {
            metrics::record_request(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            let detail = state.pipeline.strategy().describe_error(&error);
            Err(AppError::render_failed(error.stage(), &origin.url, detail))
        }
    }
}

/// Build the success response.
///
/// Captured headers go first so the renderer's own headers win on conflict.
fn document_response(document: Document, effects: &CapturedEffects) -> Response {
    let status = StatusCode::from_u16(document.status).unwrap_or(StatusCode::OK);
    let mut response = (status, document.html).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    apply_headers(headers, &effects.headers);
    apply_headers(headers, &document.headers);

    for cookie in &effects.cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("Skipping captured cookie that is not a valid header value"),
        }
    }

    response
}

fn apply_headers(headers: &mut HeaderMap, source: &BTreeMap<String, String>) {
    for (name, value) in source {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid response header"),
        }
    }
}
