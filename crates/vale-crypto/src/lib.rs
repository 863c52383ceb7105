//! Content hashing schemes for Vale.
//!
//! Bytes can be addressed two ways: by the hash-tree digest of a blob value
//! wrapping them, or by their plain SHA-256. The two address spaces are kept
//! apart here; [`ContentHasher`] computes and verifies against either one.
//!
//! All digests wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HashScheme, HasherError};
