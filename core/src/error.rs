//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the build manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid manifest JSON.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// Path that was parsed
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to parse a [`Mode`](crate::mode::Mode) name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mode '{0}' (expected development, production or test)")]
pub struct ParseModeError(pub String);
