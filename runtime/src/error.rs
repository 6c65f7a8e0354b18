//! Error types for the runtime.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from outbound calls made through [`ApiClient`](crate::client::ApiClient).
#[derive(Error, Debug)]
pub enum ApiError {
    /// A relative path was requested but no API base URL is configured.
    #[error("relative path '{0}' requires an API base URL")]
    NoBaseUrl(String),

    /// The target could not be parsed as a URL.
    #[error("invalid API url '{url}': {message}")]
    InvalidUrl {
        /// Offending input
        url: String,
        /// Parser message
        message: String,
    },

    /// The request could not be built or sent.
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("API responded {status} for {url}")]
    Status {
        /// Response status
        status: u16,
        /// Requested URL
        url: String,
    },
}

/// Errors that abort rendering of one request.
///
/// Every variant ends in a generic 500 response; the detail is only logged.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The HTML template could not be read.
    #[error("failed to read template {path}: {source}")]
    Template {
        /// Template path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The dev server failed to transform the template.
    #[error("dev server failed to transform template for {url}: {source}")]
    Transform {
        /// Request URL
        url: String,
        /// Dev server error
        #[source]
        source: anyhow::Error,
    },

    /// No renderer could be obtained (e.g. the page module failed to compile).
    #[error("failed to resolve renderer for {url}: {source}")]
    RendererResolution {
        /// Request URL
        url: String,
        /// Loader error
        #[source]
        source: anyhow::Error,
    },

    /// The renderer returned an error.
    #[error("renderer failed for {url}: {source}")]
    Render {
        /// Request URL
        url: String,
        /// Renderer error
        #[source]
        source: anyhow::Error,
    },

    /// The render result carried a status that is not a valid HTTP status.
    #[error("renderer returned invalid status code {0}")]
    InvalidStatus(u16),

    /// Rendering did not finish before the request deadline.
    #[error("rendering {url} exceeded the deadline of {deadline:?}")]
    Timeout {
        /// Request URL
        url: String,
        /// Configured deadline
        deadline: Duration,
    },
}

impl PipelineError {
    /// Short label of the failing stage, for metrics and logs.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Template { .. } | Self::Transform { .. } => "template",
            Self::RendererResolution { .. } => "resolve",
            Self::Render { .. } => "render",
            Self::InvalidStatus(_) => "assemble",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// The underlying application error, if this failure carries one.
    #[must_use]
    pub const fn application_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Transform { source, .. }
            | Self::RendererResolution { source, .. }
            | Self::Render { source, .. } => Some(source),
            _ => None,
        }
    }
}
