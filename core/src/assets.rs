//! Mapping of logical client entries to concrete asset URLs.
//!
//! Development serves source modules straight from the dev server, so a
//! logical name becomes a module path. Production serves hashed files listed
//! in the build manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::ManifestError;

/// Concrete URLs for one client entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    /// Script URL.
    pub src: String,
    /// Stylesheet URLs.
    pub css: Vec<String>,
}

/// Resolves a logical client entry name to asset URLs.
pub trait AssetResolver: Send + Sync {
    /// Resolve `name`, or `None` if it is unknown.
    fn resolve_client_entry(&self, name: &str) -> Option<ClientEntry>;
}

/// Development resolver: module paths, no hashing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevAssets;

impl AssetResolver for DevAssets {
    fn resolve_client_entry(&self, name: &str) -> Option<ClientEntry> {
        let trimmed = name.trim_start_matches('/');
        let src = if trimmed.starts_with("src/") {
            format!("/{trimmed}")
        } else {
            format!("/src/{trimmed}")
        };
        Some(ClientEntry {
            src,
            css: Vec::new(),
        })
    }
}

/// One entry of the build manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Hashed output file, relative to the client build directory.
    pub file: String,
    /// Stylesheets emitted for this entry.
    #[serde(default)]
    pub css: Vec<String>,
    /// Other static assets referenced by this entry.
    #[serde(default)]
    pub assets: Vec<String>,
}

/// Build manifest keyed by logical entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: HashMap<String, ManifestRecord>,
}

impl Manifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build a manifest from records.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, ManifestRecord)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up `name`, then its `/`-prefixed variant.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ManifestRecord> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&format!("/{name}")))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Production resolver backed by an optional manifest.
///
/// A missing manifest resolves nothing instead of failing.
#[derive(Debug, Clone, Default)]
pub struct ManifestAssets {
    manifest: Option<Arc<Manifest>>,
}

impl ManifestAssets {
    /// Wrap an already loaded manifest.
    #[must_use]
    pub fn new(manifest: Option<Manifest>) -> Self {
        Self {
            manifest: manifest.map(Arc::new),
        }
    }

    /// Load the manifest at `path`, degrading to no manifest on failure.
    #[must_use]
    pub fn load_or_warn(path: &Path) -> Self {
        match Manifest::load(path) {
            Ok(manifest) => {
                tracing::info!(path = %path.display(), entries = manifest.len(), "Manifest loaded");
                Self::new(Some(manifest))
            }
            Err(error) => {
                tracing::warn!(%error, "Manifest unavailable, client entries will not resolve");
                Self::new(None)
            }
        }
    }

    /// Whether a manifest was loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.manifest.is_some()
    }
}

impl AssetResolver for ManifestAssets {
    fn resolve_client_entry(&self, name: &str) -> Option<ClientEntry> {
        let record = self.manifest.as_ref()?.get(name)?;
        Some(ClientEntry {
            src: format!("/{}", record.file),
            css: record.css.iter().map(|css| format!("/{css}")).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest() -> Manifest {
        Manifest::from_entries([(
            "src/entry-client.tsx".to_string(),
            ManifestRecord {
                file: "assets/entry-client-4f9a1c.js".to_string(),
                css: vec!["assets/entry-client-77bd02.css".to_string()],
                assets: vec![],
            },
        )])
    }

    #[test]
    fn test_dev_assets_normalize_module_path() {
        let dev = DevAssets;
        assert_eq!(
            dev.resolve_client_entry("entry-client.tsx").unwrap().src,
            "/src/entry-client.tsx"
        );
        assert_eq!(
            dev.resolve_client_entry("/src/entry-client.tsx").unwrap().src,
            "/src/entry-client.tsx"
        );
        assert_eq!(
            dev.resolve_client_entry("src/admin/main.tsx").unwrap().src,
            "/src/admin/main.tsx"
        );
        assert!(dev.resolve_client_entry("x").unwrap().css.is_empty());
    }

    #[test]
    fn test_manifest_lookup_prefixes_paths() {
        let assets = ManifestAssets::new(Some(manifest()));
        let entry = assets.resolve_client_entry("src/entry-client.tsx").unwrap();
        assert_eq!(entry.src, "/assets/entry-client-4f9a1c.js");
        assert_eq!(entry.css, vec!["/assets/entry-client-77bd02.css"]);
    }

    #[test]
    fn test_manifest_lookup_slash_variant() {
        let manifest = Manifest::from_entries([(
            "/admin.tsx".to_string(),
            ManifestRecord {
                file: "assets/admin-1.js".to_string(),
                css: vec![],
                assets: vec![],
            },
        )]);
        let assets = ManifestAssets::new(Some(manifest));
        assert_eq!(
            assets.resolve_client_entry("admin.tsx").unwrap().src,
            "/assets/admin-1.js"
        );
    }

    #[test]
    fn test_missing_entry_resolves_to_none() {
        let assets = ManifestAssets::new(Some(manifest()));
        assert!(assets.resolve_client_entry("src/unknown.tsx").is_none());
        assert!(ManifestAssets::default().resolve_client_entry("src/entry-client.tsx").is_none());
    }

    #[test]
    fn test_load_vite_style_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "src/entry-client.tsx": {{
                    "file": "assets/entry-client-4f9a1c.js",
                    "src": "src/entry-client.tsx",
                    "isEntry": true,
                    "css": ["assets/entry-client-77bd02.css"]
                }},
                "src/logo.svg": {{ "file": "assets/logo-0a1b2c.svg" }}
            }}"#
        )
        .unwrap();

        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.get("src/logo.svg").unwrap().css.is_empty());
    }

    #[test]
    fn test_unreadable_manifest_degrades() {
        let assets = ManifestAssets::load_or_warn(Path::new("/nonexistent/manifest.json"));
        assert!(!assets.is_loaded());
        assert!(assets.resolve_client_entry("src/entry-client.tsx").is_none());
    }

    #[test]
    fn test_malformed_manifest_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Manifest::load(file.path()),
            Err(ManifestError::Parse { .. })
        ));
    }
}
