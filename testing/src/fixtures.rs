//! Templates and on-disk build output for tests.

use ssr_pipeline_core::Manifest;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Template with both placeholders.
pub const TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <!--app-head-->
  </head>
  <body>
    <div id="root"><!--app-html--></div>
  </body>
</html>
"#;

/// Template without placeholders.
pub const BARE_TEMPLATE: &str = "<html><head><title>bare</title></head><body></body></html>";

/// A build directory in a temp dir: template, manifest and client assets.
///
/// Removed from disk on drop.
pub struct BuildFixture {
    dir: TempDir,
}

impl BuildFixture {
    /// Write `template` as `index.html` in a fresh directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn new(template: &str) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("client"))?;
        std::fs::write(dir.path().join("index.html"), template)?;
        Ok(Self { dir })
    }

    /// Write `manifest` as `manifest.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn with_manifest(self, manifest: &Manifest) -> io::Result<Self> {
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.manifest_path(), json)?;
        Ok(self)
    }

    /// Write a static file below the client directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn with_client_file(self, relative: &str, contents: &str) -> io::Result<Self> {
        let path = self.client_dir().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(self)
    }

    /// Root of the fixture.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `index.html`
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        self.dir.path().join("index.html")
    }

    /// `manifest.json` (may not exist).
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("manifest.json")
    }

    /// Directory static client assets are served from.
    #[must_use]
    pub fn client_dir(&self) -> PathBuf {
        self.dir.path().join("client")
    }
}
