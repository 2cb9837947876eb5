//! Snippet collection and module-list aggregation.
//!
//! Interfaces request kernel modules by contributing snippets: raw byte
//! blobs containing a newline-separated list of module names. A line may
//! also be blank or a comment (first non-trimmed character `#`); such
//! lines carry no module. Snippets from different interfaces may overlap,
//! so aggregation deduplicates while preserving first-occurrence order.

use crate::module_name::ModuleName;
use std::collections::{HashMap, HashSet};

/// Security category under which interfaces contribute kernel module
/// snippets. Providers typically serve several categories; only this one
/// is consumed here.
pub const SECURITY_KMOD: &str = "kmod";

/// Snippets applicable to one package, keyed by app security tag. Each
/// tag maps to the ordered snippets contributed for that app.
pub type SnippetMap = HashMap<String, Vec<Vec<u8>>>;

/// Error type reported by a snippet provider.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Source of security snippets for installed packages.
#[cfg_attr(test, mockall::automock)]
pub trait SnippetProvider {
    /// Returns the snippets of the given category that apply to the
    /// package, keyed by app security tag. An empty map is a legitimate
    /// result and means no interface requested anything.
    ///
    /// # Errors
    ///
    /// Returns the provider's own error when the lookup fails.
    fn snippets_for_package(
        &self,
        package: &str,
        category: &str,
    ) -> Result<SnippetMap, ProviderError>;
}

/// One application within a package, carrying the stable security tag
/// used to look up its snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    /// Application name within the package.
    pub name: String,
    /// Stable security tag identifying this app to the snippet provider.
    pub security_tag: String,
}

impl AppIdentity {
    /// Create an app identity from a name and its security tag.
    #[must_use]
    pub fn new(name: impl Into<String>, security_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            security_tag: security_tag.into(),
        }
    }
}

/// Combine the snippets of all apps into a deduplicated module list.
///
/// Apps are visited in the order given, and each tag's snippets in the
/// order supplied, so the result is deterministic for a fixed input; the
/// snippet map's own key order is never iterated. Within a snippet,
/// lines are split on line feed and trimmed of boundary whitespace
/// (including carriage returns); blank lines and comment lines are
/// dropped. The first occurrence of a module wins and later duplicates
/// are dropped silently, even across apps and snippets. Lines that are
/// not valid UTF-8 cannot name a loadable module and are skipped.
#[must_use]
pub fn collect_modules(apps: &[AppIdentity], snippets: &SnippetMap) -> Vec<ModuleName> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();

    for app in apps {
        let Some(app_snippets) = snippets.get(&app.security_tag) else {
            continue;
        };
        for snippet in app_snippets {
            for line in snippet.split(|&byte| byte == b'\n') {
                let Ok(text) = std::str::from_utf8(line) else {
                    continue;
                };
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                if seen.insert(trimmed.to_owned()) {
                    modules.push(ModuleName::new(trimmed));
                }
            }
        }
    }

    modules
}
