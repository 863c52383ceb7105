use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use vale_types::ContentHash;

use crate::error::StoreResult;

/// Future handed to [`BlobCache::get_or_fetch`] to produce bytes on a miss.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Option<Bytes>> + Send + 'a>>;

/// Local hash-keyed byte cache.
///
/// All implementations must satisfy these invariants:
/// - The cache never interprets or verifies content; callers verify bytes
///   against the key before trusting them.
/// - `get_or_fetch` polls its fetch future at most once, and only on a miss.
/// - Concurrent `get_or_fetch` calls for one key run at most one fetch at a
///   time; waiters share a successful result.
/// - A fetch that yields `None` stores nothing.
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Read cached bytes for `hash`.
    async fn get(&self, hash: &ContentHash) -> StoreResult<Option<Bytes>>;

    /// Read cached bytes for `hash`, or run `fetch` and store what it yields.
    async fn get_or_fetch<'a>(
        &'a self,
        hash: &'a ContentHash,
        fetch: FetchFuture<'a>,
    ) -> StoreResult<Option<Bytes>>;
}
