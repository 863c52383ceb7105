use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vale_types::{ContentHash, Value};

/// One of the two addressing schemes for raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashScheme {
    /// Hash-tree digest of a blob value holding the bytes.
    HashTree,
    /// Plain SHA-256 of the bytes.
    Sha256,
}

impl HashScheme {
    /// Both schemes, in the order verification tries them.
    pub const ALL: [HashScheme; 2] = [HashScheme::HashTree, HashScheme::Sha256];
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashTree => write!(f, "hash-tree"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for HashScheme {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash-tree" => Ok(Self::HashTree),
            "sha256" => Ok(Self::Sha256),
            other => Err(HasherError::UnknownScheme(other.to_string())),
        }
    }
}

/// Computes and verifies content digests of raw bytes.
pub struct ContentHasher;

impl ContentHasher {
    /// Digest of `data` under `scheme`.
    pub fn digest(scheme: HashScheme, data: &[u8]) -> ContentHash {
        match scheme {
            HashScheme::HashTree => ContentHash::of_blob(data),
            HashScheme::Sha256 => ContentHash::sha256(data),
        }
    }

    /// Hash-tree digest of a whole value.
    pub fn value_digest(value: &Value) -> ContentHash {
        value.hash()
    }

    /// Verify that `data` produces `expected` under `scheme`.
    pub fn verify(scheme: HashScheme, data: &[u8], expected: &ContentHash) -> bool {
        Self::digest(scheme, data) == *expected
    }

    /// The first scheme under which `data` hashes to `expected`, if any.
    pub fn matching_scheme(data: &[u8], expected: &ContentHash) -> Option<HashScheme> {
        HashScheme::ALL
            .into_iter()
            .find(|scheme| Self::verify(*scheme, data, expected))
    }

    /// Returns `true` if `data` matches `expected` under either scheme.
    pub fn verify_any(data: &[u8], expected: &ContentHash) -> bool {
        Self::matching_scheme(data, expected).is_some()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("unknown hash scheme: {0}")]
    UnknownScheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes_produce_different_digests() {
        let data = b"same content";
        assert_ne!(
            ContentHasher::digest(HashScheme::HashTree, data),
            ContentHasher::digest(HashScheme::Sha256, data)
        );
    }

    #[test]
    fn hash_tree_digest_matches_blob_value() {
        let data = b"wrapped";
        assert_eq!(
            ContentHasher::digest(HashScheme::HashTree, data),
            ContentHasher::value_digest(&Value::blob(data.to_vec()))
        );
    }

    #[test]
    fn verify_correct_data() {
        let id = ContentHasher::digest(HashScheme::Sha256, b"test data");
        assert!(ContentHasher::verify(HashScheme::Sha256, b"test data", &id));
        assert!(!ContentHasher::verify(HashScheme::HashTree, b"test data", &id));
    }

    #[test]
    fn matching_scheme_identifies_either() {
        let data = b"either way";
        let tree = ContentHasher::digest(HashScheme::HashTree, data);
        let raw = ContentHasher::digest(HashScheme::Sha256, data);
        assert_eq!(ContentHasher::matching_scheme(data, &tree), Some(HashScheme::HashTree));
        assert_eq!(ContentHasher::matching_scheme(data, &raw), Some(HashScheme::Sha256));
    }

    #[test]
    fn tampered_data_matches_neither() {
        let id = ContentHasher::digest(HashScheme::Sha256, b"original");
        assert!(!ContentHasher::verify_any(b"tampered", &id));
        assert_eq!(ContentHasher::matching_scheme(b"tampered", &id), None);
    }

    #[test]
    fn scheme_parse_and_display() {
        for scheme in HashScheme::ALL {
            assert_eq!(scheme.to_string().parse::<HashScheme>().unwrap(), scheme);
        }
        assert_eq!(
            "md5".parse::<HashScheme>(),
            Err(HasherError::UnknownScheme("md5".into()))
        );
    }
}
