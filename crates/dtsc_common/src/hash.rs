//! Content fingerprints for cache invalidation.

use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit content fingerprint computed using SHA-256.
///
/// Two files with the same `ContentHash` are assumed to have identical content.
/// The cache stores the lowercase hex rendering produced by [`Display`](fmt::Display),
/// so an entry's hash can be compared without re-parsing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Computes a content fingerprint over the raw bytes of a file.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Returns the lowercase hex rendering stored in cache entries.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
