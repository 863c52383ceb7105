use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use vale_types::ContentHash;

use crate::error::StoreResult;
use crate::flight::SingleFlight;
use crate::traits::{BlobCache, FetchFuture};

/// In-memory blob cache.
///
/// Intended for tests and embedding. Entries live in a [`SingleFlight`] map,
/// so concurrent misses on one hash share a single fetch.
#[derive(Debug, Default)]
pub struct InMemoryBlobCache {
    entries: SingleFlight<ContentHash, Bytes>,
}

impl InMemoryBlobCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under `hash` without verifying them. Existing entries are
    /// kept.
    pub fn insert(&self, hash: ContentHash, bytes: impl Into<Bytes>) -> bool {
        self.entries.insert(hash, bytes.into())
    }

    /// Number of cached blobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl BlobCache for InMemoryBlobCache {
    async fn get(&self, hash: &ContentHash) -> StoreResult<Option<Bytes>> {
        Ok(self.entries.get(hash))
    }

    async fn get_or_fetch<'a>(
        &'a self,
        hash: &'a ContentHash,
        fetch: FetchFuture<'a>,
    ) -> StoreResult<Option<Bytes>> {
        if let Some(bytes) = self.entries.get(hash) {
            debug!(hash = %hash.short_hex(), "memory cache hit");
            return Ok(Some(bytes));
        }
        let fetched = self
            .entries
            .get_or_try_init(*hash, || async move { fetch.await.ok_or(()) })
            .await;
        Ok(fetched.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn key(data: &[u8]) -> ContentHash {
        ContentHash::sha256(data)
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let cache = InMemoryBlobCache::new();
        assert!(cache.get(&key(b"missing")).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn seeded_entry_is_returned_without_fetch() {
        let cache = InMemoryBlobCache::new();
        cache.insert(key(b"a"), &b"a"[..]);
        let got = cache
            .get_or_fetch(&key(b"a"), Box::pin(async { panic!("fetch must not run") }))
            .await
            .unwrap();
        assert_eq!(got.unwrap().as_ref(), b"a");
    }

    #[tokio::test]
    async fn fetched_bytes_are_cached() {
        let cache = InMemoryBlobCache::new();
        let hash = key(b"payload");
        let got = cache
            .get_or_fetch(&hash, Box::pin(async { Some(Bytes::from_static(b"payload")) }))
            .await
            .unwrap();
        assert_eq!(got.unwrap().as_ref(), b"payload");
        assert_eq!(cache.get(&hash).await.unwrap().unwrap().as_ref(), b"payload");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_stores_nothing() {
        let cache = InMemoryBlobCache::new();
        let hash = key(b"absent");
        let got = cache
            .get_or_fetch(&hash, Box::pin(async { None }))
            .await
            .unwrap();
        assert!(got.is_none());
        assert!(cache.get(&hash).await.unwrap().is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.entries.cells_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let cache = Arc::new(InMemoryBlobCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let hash = key(b"shared");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let fetches = Arc::clone(&fetches);
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(
                            &hash,
                            Box::pin(async {
                                fetches.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(20)).await;
                                Some(Bytes::from_static(b"shared"))
                            }),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap().as_ref(), b"shared");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_format() {
        let cache = InMemoryBlobCache::new();
        let debug = format!("{cache:?}");
        assert!(debug.contains("InMemoryBlobCache"));
    }
}
