//! Kernel module reconciliation backend.
//!
//! Interfaces may request kernel modules by contributing snippets under
//! the [`SECURITY_KMOD`] category: newline-separated lists of module
//! names. The backend merges the snippets of all interfaces affecting a
//! package into one deduplicated conf file under the modules directory,
//! ensuring the modules are loaded when the system boots, and loads them
//! immediately via `modprobe`. When a package is removed or the
//! contributing interface disconnected, the conf file is deleted; no
//! kernel modules are ever unloaded, since a loaded module may still be
//! in use by other subsystems.
//!
//! The backend holds no state between calls and performs no locking;
//! callers serialize `setup`/`remove` per package identity. Calls for
//! distinct packages touch disjoint artifacts and are independent.

use crate::conf::{ConfDir, MODULES_LOAD_DIR, WriteOutcome, render_modules};
use crate::error::{KmodError, Result};
use crate::loader::{CommandExecutor, load_modules};
use crate::module_name::ModuleName;
use crate::snippets::{AppIdentity, SECURITY_KMOD, SnippetProvider, collect_modules};
use camino::{Utf8Path, Utf8PathBuf};

/// Outcome of a successful [`Backend::setup`] call.
///
/// This is deliberately not folded into the error type: all three
/// variants leave the persisted artifact fully consistent with the
/// snippet state that was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// A new module list was written and its modules loaded.
    Applied {
        /// The modules now declared in the artifact, in artifact order.
        modules: Vec<ModuleName>,
    },
    /// The artifact already matched the computed module list; neither
    /// disk nor the module loader was touched.
    Unchanged,
    /// No modules are requested for this package; any existing artifact
    /// was removed.
    Removed,
}

/// Reconciles per-package kernel module auto-load configuration.
#[derive(Debug, Clone)]
pub struct Backend {
    conf: ConfDir,
}

impl Default for Backend {
    fn default() -> Self {
        Self::new(MODULES_LOAD_DIR)
    }
}

impl Backend {
    /// Create a backend storing artifacts under the given directory.
    #[must_use]
    pub fn new(conf_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            conf: ConfDir::new(conf_dir),
        }
    }

    /// Name of this security backend.
    #[must_use]
    pub fn name(&self) -> &'static str {
        "kmod"
    }

    /// Directory the backend stores artifacts under.
    #[must_use]
    pub fn conf_dir(&self) -> &Utf8Path {
        self.conf.dir()
    }

    /// Artifact path for a package.
    #[must_use]
    pub fn conf_path(&self, package: &str) -> Utf8PathBuf {
        self.conf.conf_path(package)
    }

    /// Synchronize the package's module artifact with its current
    /// snippets and load any newly declared modules.
    ///
    /// The provider is asked for all [`SECURITY_KMOD`] snippets that
    /// apply to the package; `apps` supplies the iteration order, so the
    /// derived module list is deterministic. When no interface requests
    /// modules any more, the existing artifact is removed. When the
    /// computed list matches the persisted artifact, nothing is written
    /// and no modules are loaded.
    ///
    /// If the call fails it should be retried, with a sensible backoff
    /// strategy, by the caller; a retry re-derives the module list from
    /// the snippet state current at that point.
    ///
    /// # Errors
    ///
    /// Returns [`KmodError::EmptyPackageName`] for an empty package
    /// identity, [`KmodError::SnippetLookup`] when the provider fails
    /// (no side effects performed), a persistence error when the
    /// artifact cannot be read, written, or removed (module loading is
    /// skipped), or [`KmodError::ModuleLoad`] when one or more modules
    /// fail to load (the artifact stays in place).
    pub fn setup(
        &self,
        package: &str,
        apps: &[AppIdentity],
        provider: &dyn SnippetProvider,
        executor: &dyn CommandExecutor,
    ) -> Result<SetupOutcome> {
        if package.is_empty() {
            return Err(KmodError::EmptyPackageName);
        }

        let snippets = provider
            .snippets_for_package(package, SECURITY_KMOD)
            .map_err(|source| KmodError::SnippetLookup {
                package: package.to_owned(),
                source,
            })?;

        // Disconnecting the last module-requesting interface must still
        // clean up, even though nothing may have been written before.
        if snippets.is_empty() {
            self.conf.remove(package)?;
            log::debug!("no kernel module snippets for package {package}");
            return Ok(SetupOutcome::Removed);
        }

        let modules = collect_modules(apps, &snippets);
        if modules.is_empty() {
            self.conf.remove(package)?;
            log::debug!("snippets for package {package} request no modules");
            return Ok(SetupOutcome::Removed);
        }

        let content = render_modules(&modules);
        if self.conf.write_if_changed(package, &content)? == WriteOutcome::Unchanged {
            log::debug!("module list for package {package} is unchanged");
            return Ok(SetupOutcome::Unchanged);
        }

        log::info!(
            "loading {} kernel module(s) for package {package}",
            modules.len()
        );
        load_modules(executor, &modules)?;

        Ok(SetupOutcome::Applied { modules })
    }

    /// Remove the package's module artifact.
    ///
    /// Modules already loaded on behalf of the package stay loaded: a
    /// shared kernel module cannot be unloaded safely without knowing
    /// whether other subsystems still depend on it. A missing artifact
    /// is not an error, so the call can be retried freely.
    ///
    /// # Errors
    ///
    /// Returns [`KmodError::RemoveConf`] when the artifact exists but
    /// cannot be deleted; a later successful call cleans up the stale
    /// artifact.
    pub fn remove(&self, package: &str) -> Result<()> {
        if package.is_empty() {
            return Err(KmodError::EmptyPackageName);
        }
        self.conf.remove(package)
    }
}

#[cfg(test)]
mod tests;
