//! Policy stores.

use parking_lot::RwLock;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::types::{LevelId, PathPrefix};
use super::{PolicyDocument, PolicyError};

/// Default cap on the policy document size.
pub const DEFAULT_POLICY_MAX_BYTES: u64 = 64 * 1024;

/// Source of the authorization policy.
///
/// Implementations load the document fresh on every call and keep no parsed
/// state between calls.
pub trait PolicyStore: Send + Sync {
    /// Load and parse the current document.
    fn load(&self) -> Result<PolicyDocument, PolicyError>;

    /// Whether `base_path` is allowed for `level` under the current document.
    fn is_allowed(&self, level: LevelId, base_path: &PathPrefix) -> Result<bool, PolicyError> {
        Ok(self.load()?.is_allowed(level, base_path))
    }
}

/// Policy store backed by an XML file on disk.
///
/// The file size is checked before reading and documents above `max_bytes`
/// are rejected without being parsed.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    path: PathBuf,
    max_bytes: u64,
}

impl FilePolicyStore {
    /// Create a store for `path` with the default size cap.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_bytes(path, DEFAULT_POLICY_MAX_BYTES)
    }

    /// Create a store with an explicit size cap.
    pub fn with_max_bytes(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: impl ToString) -> PolicyError {
        PolicyError::Unavailable {
            source_name: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn read_capped(&self) -> Result<String, PolicyError> {
        let file = File::open(&self.path).map_err(|e| self.unavailable(e))?;
        let size = file.metadata().map_err(|e| self.unavailable(e))?.len();
        if size > self.max_bytes {
            return Err(PolicyError::TooLarge { limit: self.max_bytes });
        }

        // The file may grow between the metadata check and the read.
        let mut buf = String::new();
        file.take(self.max_bytes + 1)
            .read_to_string(&mut buf)
            .map_err(|e| self.unavailable(e))?;
        if buf.len() as u64 > self.max_bytes {
            return Err(PolicyError::TooLarge { limit: self.max_bytes });
        }
        Ok(buf)
    }
}

impl PolicyStore for FilePolicyStore {
    fn load(&self) -> Result<PolicyDocument, PolicyError> {
        let xml = self.read_capped()?;
        PolicyDocument::parse(&xml)
    }
}

/// Policy store holding the document source in memory.
///
/// The source is still parsed on every call; replacing it with
/// [`InMemoryPolicyStore::set_source`] takes effect on the next check.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    source: RwLock<Option<String>>,
    max_bytes: Option<u64>,
}

impl InMemoryPolicyStore {
    /// Create a store with a document source.
    pub fn new(xml: impl Into<String>) -> Self {
        Self {
            source: RwLock::new(Some(xml.into())),
            max_bytes: None,
        }
    }

    /// Create a store with no document (every check is unavailable).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Apply a size cap to the held source.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Replace the document source.
    pub fn set_source(&self, xml: impl Into<String>) {
        *self.source.write() = Some(xml.into());
    }

    /// Remove the document.
    pub fn clear(&self) {
        *self.source.write() = None;
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn load(&self) -> Result<PolicyDocument, PolicyError> {
        let guard = self.source.read();
        let xml = guard.as_deref().ok_or_else(|| PolicyError::Unavailable {
            source_name: "memory".to_string(),
            reason: "no document loaded".to_string(),
        })?;
        if let Some(limit) = self.max_bytes {
            if xml.len() as u64 > limit {
                return Err(PolicyError::TooLarge { limit });
            }
        }
        PolicyDocument::parse(xml)
    }
}
