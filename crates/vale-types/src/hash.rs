use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Length in bytes of every digest produced by Vale.
pub const HASH_LEN: usize = 32;

/// A 32-byte content digest.
///
/// The same type carries digests from both addressing schemes: the structural
/// hash tree over a [`Value`](crate::Value) and the plain SHA-256 of raw bytes.
/// Which scheme produced a given digest is not recorded; callers that need to
/// tell them apart compare against both.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// SHA-256 of raw bytes, with no structural framing.
    pub fn sha256(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Hash-tree digest of a blob holding `data`.
    pub fn of_blob(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("blob {}\0", data.len()).as_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash-tree digest of a list given the digests of its elements in order.
    pub fn of_list<'a, I>(children: I) -> Self
    where
        I: ExactSizeIterator<Item = &'a ContentHash>,
    {
        let mut hasher = Sha256::new();
        hasher.update(format!("list {}\0", children.len()).as_bytes());
        for child in children {
            hasher.update(child.0);
        }
        Self(hasher.finalize().into())
    }

    /// Create a `ContentHash` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; HASH_LEN]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string (either case).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Copy from a byte slice of exactly [`HASH_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ContentHash> for [u8; HASH_LEN] {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
