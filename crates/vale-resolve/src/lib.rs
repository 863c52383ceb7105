//! Hash resolution for Vale.
//!
//! Given a content hash and an ordered list of hint sources, [`HashResolver`]
//! produces bytes that hash to it, or an error explaining what every source
//! returned.
//!
//! # Resolution order
//!
//! 1. The local [`vale_store::BlobCache`].
//! 2. On a miss, each hint source in order. A [`TreeProvider`] turns the
//!    source into file trees, which are searched for a blob with a matching
//!    SHA-256. The first match is stored in the cache.
//! 3. The optional [`FallbackProvider`], whose bytes are never cached.
//!
//! Bytes from any of these are accepted only if they match the requested hash
//! under the hash-tree scheme or plain SHA-256. A source that is unreachable
//! or lacks the blob never fails the call on its own; it is listed in the
//! [`ResolveError::NotFound`] message if nothing else succeeds.

pub mod config;
pub mod error;
pub mod provider;
pub mod report;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveResult};
pub use provider::{DirectoryTreeProvider, FallbackProvider, StaticTreeProvider, TreeProvider};
pub use report::SourceFailures;
pub use resolver::{HashResolver, Origin, Resolved};
