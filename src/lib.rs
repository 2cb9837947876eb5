//! Kernel module auto-load reconciliation for installed packages.
//!
//! This crate keeps one question answered per installed package: which
//! kernel modules should auto-load on its behalf? Interface definitions
//! contribute snippets listing the modules they need; the backend merges
//! them into a single deduplicated conf file per package under the
//! modules directory and loads the modules immediately, without a
//! reboot. The crate is a library with no CLI or daemon surface; an
//! orchestration layer decides when `setup` and `remove` run.
//!
//! # Modules
//!
//! - [`backend`] - The reconciler: `setup`/`remove` orchestration
//! - [`conf`] - Persisted artifact store with atomic replace-on-write
//! - [`error`] - Semantic error types with retry guidance
//! - [`loader`] - Best-effort module activation via `modprobe`
//! - [`module_name`] - Semantic wrapper for kernel module names
//! - [`snippets`] - Snippet provider trait and module-list aggregation

pub mod backend;
pub mod conf;
pub mod error;
pub mod loader;
pub mod module_name;
pub mod snippets;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
