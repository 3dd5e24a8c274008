//! Content hashing using blake3.
//!
//! Two kinds of fingerprint are built from [`ContentHash`]:
//! - source fingerprint: sources + processor settings (+ locale), detects staleness
//! - content fingerprint: compiled output bytes, used as the ETag

use std::fmt;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a byte slice in one shot.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Strong validator: first 16 hex chars, quoted.
    pub fn etag(self) -> String {
        format!("\"{}\"", &self.to_hex()[..16])
    }

    /// Short version string for cache-busting URLs (first 8 hex chars).
    pub fn version(self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Incremental builder for source fingerprints.
///
/// Every field is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
pub struct Fingerprinter {
    hasher: blake3::Hasher,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
        }
    }

    /// Feed one tagged field.
    pub fn field(&mut self, tag: &str, data: impl AsRef<[u8]>) -> &mut Self {
        let data = data.as_ref();
        self.hasher.update(tag.as_bytes());
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    pub fn finish(&self) -> ContentHash {
        ContentHash::new(*self.hasher.finalize().as_bytes())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
