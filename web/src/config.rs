//! Configuration management for the SSR server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Path defaults depend on the mode: development reads sources from the
//! project root, production reads the client build under `dist/client`.

use reqwest::Url;
use ssr_pipeline_core::{Mode, ParseModeError};
use ssr_pipeline_runtime::ApiClientConfig;
use ssr_pipeline_runtime::interceptor::DEFAULT_CSRF_HEADER;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `SSR_MODE` is not a known mode.
    #[error(transparent)]
    Mode(#[from] ParseModeError),

    /// `SSR_API_BASE_URL` is not an absolute URL.
    #[error("invalid SSR_API_BASE_URL '{url}': {message}")]
    ApiBaseUrl {
        /// Configured value
        url: String,
        /// Parser message
        message: String,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run mode (`SSR_MODE`, default development)
    pub mode: Mode,
    /// Listener configuration
    pub server: ServerConfig,
    /// On-disk inputs
    pub paths: PathsConfig,
    /// Nested API calls
    pub api: ApiConfig,
    /// Bound on resolve + render + assemble (`None` = unbounded)
    pub render_timeout: Option<Duration>,
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Scheme of the public URL when no `X-Forwarded-Proto` is sent
    pub scheme: String,
}

/// On-disk inputs
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// HTML template (source template in development, built one in production)
    pub template: PathBuf,
    /// Build manifest (production)
    pub manifest: PathBuf,
    /// Client build directory served as static files (production)
    pub static_dir: PathBuf,
    /// Project root the dev server serves `/src` from (development)
    pub source_root: PathBuf,
}

/// Nested API call configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL relative API paths resolve against
    pub base_url: Option<Url>,
    /// Anti-forgery header captured from responses
    pub csrf_header: String,
    /// Per-call timeout (`None` = unbounded)
    pub timeout: Option<Duration>,
    /// Forward the inbound `Cookie` header to the API origin
    pub forward_cookies: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SSR_MODE` or `SSR_API_BASE_URL` is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// Unparsable numbers and flags fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SSR_MODE` or `SSR_API_BASE_URL` is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup("SSR_MODE") {
            Some(raw) => raw.parse()?,
            None => Mode::Development,
        };
        let production = matches!(mode, Mode::Production);

        let base_url = match lookup("SSR_API_BASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(Url::parse(raw.trim()).map_err(|e| ConfigError::ApiBaseUrl {
                url: raw.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };

        let path = |key: &str, default: &str| {
            lookup(key).map_or_else(|| PathBuf::from(default), PathBuf::from)
        };

        Ok(Self {
            mode,
            server: ServerConfig {
                host: lookup("SSR_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: lookup("SSR_PORT")
                    .or_else(|| lookup("PORT"))
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
                scheme: lookup("SSR_SCHEME").unwrap_or_else(|| "http".to_string()),
            },
            paths: PathsConfig {
                template: path(
                    "SSR_TEMPLATE_PATH",
                    if production { "dist/client/index.html" } else { "index.html" },
                ),
                manifest: path("SSR_MANIFEST_PATH", "dist/client/.vite/manifest.json"),
                static_dir: path("SSR_STATIC_DIR", "dist/client"),
                source_root: path("SSR_SOURCE_ROOT", "."),
            },
            api: ApiConfig {
                base_url,
                csrf_header: lookup("SSR_CSRF_HEADER")
                    .unwrap_or_else(|| DEFAULT_CSRF_HEADER.to_string()),
                timeout: millis(lookup("SSR_API_TIMEOUT_MS"), 5_000),
                forward_cookies: lookup("SSR_FORWARD_COOKIES")
                    .and_then(|s| parse_flag(&s))
                    .unwrap_or(true),
            },
            render_timeout: millis(lookup("SSR_RENDER_TIMEOUT_MS"), 10_000),
        })
    }

    /// `host:port` to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Settings for the shared API client.
    #[must_use]
    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: self.api.timeout,
            forward_cookies: self.api.forward_cookies,
            csrf_header: self.api.csrf_header.clone(),
        }
    }
}

/// `0` disables the timeout.
fn millis(raw: Option<String>, default: u64) -> Option<Duration> {
    let ms = raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default);
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
