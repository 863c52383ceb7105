//! Local hash-keyed storage for Vale.
//!
//! This crate holds the pieces the resolver reads from and writes to without
//! interpreting them:
//!
//! - [`BlobCache`]: a byte cache keyed by content hash, with a lazy
//!   get-or-fetch entry point.
//!   - [`InMemoryBlobCache`]: map-backed, for tests and embedding.
//!   - [`FileSystemBlobCache`]: one file per hash under a root directory.
//! - [`SingleFlight`]: the concurrent get-or-populate map both caches and the
//!   resolver's per-source tree cache are built on.
//! - [`FileTree`]: named blobs as produced by a source, loadable from disk.
//!
//! # Rules
//!
//! 1. Caches never verify content. Callers hash what they read.
//! 2. A fetch runs at most once per miss, and concurrent misses on one key
//!    share it.
//! 3. A failed fetch stores nothing.
//! 4. I/O errors are propagated, never silently ignored.

pub mod error;
pub mod filesystem;
pub mod flight;
pub mod memory;
pub mod traits;
pub mod tree;

pub use error::{StoreError, StoreResult};
pub use filesystem::FileSystemBlobCache;
pub use flight::SingleFlight;
pub use memory::InMemoryBlobCache;
pub use traits::{BlobCache, FetchFuture};
pub use tree::{BlobAtPath, FileTree};
