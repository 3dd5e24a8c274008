//! Source file providers.
//!
//! Assets name their inputs by identifier; a [`SourceReader`] turns an
//! identifier into bytes. [`FsSource`] resolves identifiers against a root
//! directory, [`MemorySource`] keeps them in memory (embedding, tests).

use std::fs;
use std::path::PathBuf;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::error::SourceNotFoundError;

/// File-content provider capability.
pub trait SourceReader: Send + Sync {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceNotFoundError>;
}

/// Read every identifier as UTF-8 text.
///
/// Reads run in parallel; the result keeps the order of `ids`.
pub fn read_all(reader: &dyn SourceReader, ids: &[String]) -> Result<Vec<String>, SourceNotFoundError> {
    ids.par_iter()
        .map(|id| {
            let bytes = reader.read(id)?;
            String::from_utf8(bytes).map_err(|e| SourceNotFoundError::new(id.as_str(), e))
        })
        .collect()
}

// ============================================================================
// Filesystem
// ============================================================================

/// Reads identifiers as paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> PathBuf {
        self.root.join(id.trim_start_matches('/'))
    }
}

impl SourceReader for FsSource {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceNotFoundError> {
        let path = self.resolve(id);
        fs::read(&path).map_err(|e| SourceNotFoundError::new(id, e))
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Thread-safe in-memory source map.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: DashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.set(id, content);
        self
    }

    /// Insert or replace a file.
    pub fn set(&self, id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(id.into(), content.into());
    }

    pub fn remove(&self, id: &str) -> bool {
        self.files.remove(id).is_some()
    }
}

impl SourceReader for MemorySource {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceNotFoundError> {
        self.files
            .get(id)
            .map(|content| content.clone())
            .ok_or_else(|| SourceNotFoundError::new(id, "no such source"))
    }
}
