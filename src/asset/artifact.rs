//! Compiled output of one asset variant.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::freshness::ContentHash;

/// Immutable compile result; replaced as a whole, never mutated.
#[derive(Debug)]
pub struct CompiledArtifact {
    output: Arc<[u8]>,
    content_hash: ContentHash,
    source_fingerprint: ContentHash,
    compiled_at: SystemTime,
    generation: u64,
}

impl CompiledArtifact {
    pub(crate) fn new(output: Vec<u8>, source_fingerprint: ContentHash, generation: u64) -> Self {
        Self {
            content_hash: ContentHash::of(&output),
            output: output.into(),
            source_fingerprint,
            compiled_at: now_secs(),
            generation,
        }
    }

    /// Move the compile time past `previous`, so a replacement always
    /// carries a later `Last-Modified` even within the same second.
    pub(crate) fn after(mut self, previous: Option<&CompiledArtifact>) -> Self {
        if let Some(previous) = previous {
            let floor = previous.compiled_at + Duration::from_secs(1);
            self.compiled_at = self.compiled_at.max(floor);
        }
        self
    }

    /// Output bytes, shareable without copying.
    pub fn output(&self) -> &Arc<[u8]> {
        &self.output
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Hash of the output bytes.
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Hash of the inputs this artifact was built from.
    pub fn source_fingerprint(&self) -> ContentHash {
        self.source_fingerprint
    }

    pub fn compiled_at(&self) -> SystemTime {
        self.compiled_at
    }

    /// Sequence number among this variant's successful compiles.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Strong validator for the `ETag` header.
    pub fn etag(&self) -> String {
        self.content_hash.etag()
    }

    /// Short version for cache-busting URLs.
    pub fn version(&self) -> String {
        self.content_hash.version()
    }

    /// `Last-Modified` header value.
    pub fn last_modified(&self) -> String {
        httpdate::fmt_http_date(self.compiled_at)
    }
}

/// Current time truncated to whole seconds, the resolution of HTTP dates.
fn now_secs() -> SystemTime {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}
