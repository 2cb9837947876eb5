//! Semantic wrapper for kernel module names.
//!
//! This module provides the [`ModuleName`] newtype for type-safe handling
//! of module names between snippet aggregation, the persisted artifact,
//! and the module loader.

use std::fmt;

/// A kernel module name taken verbatim from an interface snippet line.
///
/// This newtype wrapper provides type safety for module names, ensuring
/// they are passed explicitly rather than as raw strings. Names are
/// compared byte-for-byte; no case folding or other normalisation is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a new module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the module name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
