//! Persisted module-list artifacts.
//!
//! Each package owns exactly one conf file under the modules directory
//! (`/etc/modules-load.d` on a real system), containing one module name
//! per line in deduplicated first-occurrence order, newline-terminated,
//! with no comments or blank lines. Writes are replace-on-write: content
//! is staged to a temporary file in the same directory and renamed into
//! place, so a concurrent reader never observes a partial artifact.

use crate::error::{KmodError, Result};
use crate::module_name::ModuleName;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;

/// Default directory where module auto-load configuration lives.
pub const MODULES_LOAD_DIR: &str = "/etc/modules-load.d";

#[cfg(unix)]
const CONF_FILE_MODE: u32 = 0o644;

/// Outcome of a conditional artifact write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The artifact was created or its content replaced.
    Written,
    /// The artifact already had the requested content; disk was not
    /// touched.
    Unchanged,
}

/// Store for per-package module-list conf files.
#[derive(Debug, Clone)]
pub struct ConfDir {
    dir: Utf8PathBuf,
}

impl ConfDir {
    /// Create a store rooted at the given directory. The directory is
    /// created on the first write, not here.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Return the directory root.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Return the artifact path for a package.
    #[must_use]
    pub fn conf_path(&self, package: &str) -> Utf8PathBuf {
        self.dir.join(format!("{package}.conf"))
    }

    /// Read the current artifact content for a package, or `None` when
    /// no artifact exists.
    ///
    /// # Errors
    ///
    /// Returns [`KmodError::ReadConf`] when the file exists but cannot
    /// be read.
    pub fn current_content(&self, package: &str) -> Result<Option<String>> {
        let path = self.conf_path(package);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KmodError::ReadConf { path, source }),
        }
    }

    /// Write the artifact for a package unless it already has exactly
    /// the requested content.
    ///
    /// The content is staged to a temporary file in the conf directory,
    /// given world-readable permissions, and renamed over the final
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`KmodError::CreateDirectory`] when the conf directory
    /// cannot be created, [`KmodError::ReadConf`] when the current
    /// content cannot be compared, or [`KmodError::WriteConf`] when
    /// staging or renaming fails.
    pub fn write_if_changed(&self, package: &str, content: &str) -> Result<WriteOutcome> {
        if self.current_content(package)?.as_deref() == Some(content) {
            return Ok(WriteOutcome::Unchanged);
        }

        fs::create_dir_all(&self.dir).map_err(|source| KmodError::CreateDirectory {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.conf_path(package);
        let write_err = |source: std::io::Error| KmodError::WriteConf {
            path: self.conf_path(package),
            source,
        };

        let mut staged = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        staged.write_all(content.as_bytes()).map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(fs::Permissions::from_mode(CONF_FILE_MODE))
                .map_err(write_err)?;
        }

        staged.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(WriteOutcome::Written)
    }

    /// Remove the artifact for a package. A missing artifact is not an
    /// error, so removal is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`KmodError::RemoveConf`] when the file exists but
    /// cannot be deleted.
    pub fn remove(&self, package: &str) -> Result<()> {
        let path = self.conf_path(package);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(KmodError::RemoveConf { path, source }),
        }
    }
}

/// Render a module list as artifact content: one module per line,
/// newline-terminated. An empty list renders as the empty string, which
/// callers treat as "delete the artifact" rather than writing it.
#[must_use]
pub fn render_modules(modules: &[ModuleName]) -> String {
    let mut content = String::new();
    for module in modules {
        content.push_str(module.as_str());
        content.push('\n');
    }
    content
}
