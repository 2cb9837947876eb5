//! Error types for the kernel module backend.
//!
//! This module defines semantic error variants carrying enough context
//! (package identity, artifact path, failing module names) for the caller
//! to make logging and retry decisions. Both backend operations are safe
//! to retry after any of these errors.

use crate::module_name::ModuleName;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// A single kernel module that could not be loaded, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLoadFailure {
    /// Name of the module that failed to load.
    pub module: ModuleName,
    /// Description of the failure, typically modprobe's stderr.
    pub reason: String,
}

impl fmt::Display for ModuleLoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.module, self.reason)
    }
}

/// Errors that can occur while reconciling a package's kernel modules.
#[derive(Debug, Error)]
pub enum KmodError {
    /// The package identity was empty.
    #[error("package name must not be empty")]
    EmptyPackageName,

    /// The snippet provider failed; no side effects were performed.
    #[error("cannot obtain kernel module snippets for package {package}: {source}")]
    SnippetLookup {
        /// Package whose snippets were requested.
        package: String,
        /// Underlying provider error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The modules configuration directory could not be created.
    #[error("failed to create modules directory {path}: {source}")]
    CreateDirectory {
        /// Directory path that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The current modules file could not be read for change detection.
    #[error("failed to read modules file {path}: {source}")]
    ReadConf {
        /// File path that could not be read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The modules file could not be written; module loading was skipped.
    #[error("failed to write modules file {path}: {source}")]
    WriteConf {
        /// File path that could not be written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The modules file could not be removed.
    #[error("failed to remove modules file {path}: {source}")]
    RemoveConf {
        /// File path that could not be removed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// One or more kernel modules failed to load. The modules file is
    /// left in place; the on-disk declaration and the live kernel state
    /// converge when the caller retries.
    #[error("cannot load kernel modules: {}", format_failures(.failures))]
    ModuleLoad {
        /// Per-module failures, in module list order.
        failures: Vec<ModuleLoadFailure>,
    },
}

/// Result type alias using [`KmodError`].
pub type Result<T> = std::result::Result<T, KmodError>;

fn format_failures(failures: &[ModuleLoadFailure]) -> String {
    let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
    parts.join(", ")
}
