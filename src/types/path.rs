//! Path prefixes used as the unit of access-control granularity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized absolute path such as `/map` or `/insert_rock`.
///
/// Invariant: always starts with exactly one `/` and never ends with `/`
/// unless it is the root path itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathPrefix(String);

impl PathPrefix {
    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse a path entry from a policy document.
    ///
    /// The text is trimmed and must be absolute. Trailing separators are
    /// dropped. Returns `None` for relative or empty entries.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if !s.starts_with('/') {
            return None;
        }
        let body = s.trim_matches('/');
        if body.is_empty() {
            return Some(Self::root());
        }
        Some(Self(format!("/{}", body)))
    }

    /// Derive the base path of a request path.
    ///
    /// Strips leading and trailing separators, keeps the first segment and
    /// re-prefixes a single `/`: `/insert_rock/extra` becomes `/insert_rock`,
    /// and `/` (or an empty path) becomes `/`.
    pub fn base_of(request_path: &str) -> Self {
        let first = request_path
            .trim_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        Self(format!("/{}", first))
    }

    /// Whether this prefix covers `other` under segment-aware prefix matching.
    ///
    /// `/` covers everything; otherwise `other` must equal this prefix or
    /// continue it with a `/`. `/insert` does not cover `/insert_rock`.
    pub fn covers(&self, other: &PathPrefix) -> bool {
        if self.is_root() || self.0 == other.0 {
            return true;
        }
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
