use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use vale_crypto::{ContentHasher, HashScheme};
use vale_store::{BlobCache, FileSystemBlobCache, FileTree, InMemoryBlobCache, SingleFlight};
use vale_types::ContentHash;

use crate::config::{merge_hints, ResolverConfig};
use crate::error::{ResolveError, ResolveResult};
use crate::provider::{FallbackProvider, TreeProvider};
use crate::report::{describe_search, find_blob, SourceFailures, NO_TREES};

/// Where resolved bytes came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Already in the local cache, or fetched by a concurrent resolution.
    Cache,
    /// Found in a tree from this hint source, then cached.
    Source(String),
    /// Produced by the fallback provider. Not cached.
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Cache => f.write_str("cache"),
            Origin::Source(source) => write!(f, "hint source {source}"),
            Origin::Fallback => f.write_str("fallback"),
        }
    }
}

/// Verified bytes for a requested hash.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub bytes: Bytes,
    /// The scheme under which `bytes` hash to the requested hash.
    pub scheme: HashScheme,
    pub origin: Origin,
}

/// Resolves content hashes to verified bytes.
///
/// Lookup order is the local cache, then each hint source in turn, then the
/// fallback provider. Whatever is found must hash to the requested value under
/// one of the [`HashScheme`]s, otherwise resolution fails with
/// [`ResolveError::HashMismatch`].
///
/// Trees downloaded from a hint source are kept for the life of the resolver
/// and shared between concurrent resolutions, so each source is downloaded at
/// most once. A failed download is not kept and will be retried.
pub struct HashResolver {
    cache: Arc<dyn BlobCache>,
    provider: Arc<dyn TreeProvider>,
    fallback: Option<Arc<dyn FallbackProvider>>,
    default_hints: Vec<String>,
    trees: SingleFlight<String, Arc<Vec<FileTree>>>,
}

impl HashResolver {
    pub fn new(cache: Arc<dyn BlobCache>, provider: Arc<dyn TreeProvider>) -> Self {
        Self {
            cache,
            provider,
            fallback: None,
            default_hints: Vec::new(),
            trees: SingleFlight::new(),
        }
    }

    /// Build a resolver from config: an on-disk cache when `cache_dir` is set,
    /// an in-memory one otherwise.
    pub fn from_config(
        config: &ResolverConfig,
        provider: Arc<dyn TreeProvider>,
    ) -> ResolveResult<Self> {
        let cache: Arc<dyn BlobCache> = match &config.cache_dir {
            Some(dir) => Arc::new(FileSystemBlobCache::open(dir)?),
            None => Arc::new(InMemoryBlobCache::new()),
        };
        Ok(Self::new(cache, provider).with_default_hints(config.hint_sources.clone()))
    }

    pub fn with_fallback(mut self, fallback: impl FallbackProvider + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Hint sources tried after the ones passed to each call.
    pub fn with_default_hints(mut self, hints: Vec<String>) -> Self {
        self.default_hints = hints;
        self
    }

    /// Resolve a hex-encoded hash.
    pub async fn resolve(&self, hash_hex: &str, hints: &[String]) -> ResolveResult<Resolved> {
        let hash = ContentHash::from_hex(hash_hex).map_err(|source| ResolveError::InvalidHash {
            input: hash_hex.to_string(),
            source,
        })?;
        self.resolve_hash(&hash, hints).await
    }

    pub async fn resolve_hash(
        &self,
        hash: &ContentHash,
        hints: &[String],
    ) -> ResolveResult<Resolved> {
        let hints = merge_hints(hints, &self.default_hints);
        let mut failures = SourceFailures::default();
        let mut winner: Option<String> = None;

        let fetch = Box::pin(self.fetch_from_hints(hash, &hints, &mut failures, &mut winner));
        let cached = self.cache.get_or_fetch(hash, fetch).await?;

        let (bytes, origin) = match cached {
            Some(bytes) => (bytes, winner.map_or(Origin::Cache, Origin::Source)),
            None => match self.fallback.as_ref().and_then(|f| f.provide(hash.as_bytes())) {
                Some(bytes) => (bytes, Origin::Fallback),
                None => {
                    for (source, failure) in failures.iter() {
                        debug!(source = %source, failure = failure.lines().next().unwrap_or_default(), "hint source failed");
                    }
                    return Err(ResolveError::NotFound {
                        hash: *hash,
                        message: format!(
                            "Could not find bytes for {hash} in the cache, hint sources or fallback.\n{failures}"
                        ),
                    })
                }
            },
        };

        let scheme = ContentHasher::matching_scheme(&bytes, hash)
            .ok_or(ResolveError::HashMismatch { expected: *hash })?;
        info!(hash = %hash.short_hex(), %origin, %scheme, len = bytes.len(), "resolved");
        Ok(Resolved {
            bytes,
            scheme,
            origin,
        })
    }

    /// Search hint sources in order, stopping at the first match.
    async fn fetch_from_hints(
        &self,
        hash: &ContentHash,
        hints: &[String],
        failures: &mut SourceFailures,
        winner: &mut Option<String>,
    ) -> Option<Bytes> {
        for source in hints {
            let trees = self.trees_for(source).await;
            if trees.is_empty() {
                failures.record(source.clone(), NO_TREES);
                continue;
            }
            match find_blob(&trees, hash) {
                Some(bytes) => {
                    debug!(hash = %hash.short_hex(), source = %source, "found blob");
                    *winner = Some(source.clone());
                    return Some(bytes);
                }
                None => failures.record(source.clone(), describe_search(&trees)),
            }
        }
        None
    }

    /// Trees for `source`, downloaded once and shared. Provider errors yield
    /// an empty list.
    async fn trees_for(&self, source: &str) -> Arc<Vec<FileTree>> {
        let loaded = self
            .trees
            .get_or_try_init(source.to_string(), || async {
                debug!(source = %source, "loading trees");
                self.provider.trees_from_source(source).await.map(Arc::new)
            })
            .await;
        match loaded {
            Ok(trees) => trees,
            Err(e) => {
                warn!(source = %source, error = %e, "failed to load trees");
                Arc::new(Vec::new())
            }
        }
    }
}

impl fmt::Debug for HashResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashResolver")
            .field("default_hints", &self.default_hints)
            .field("has_fallback", &self.fallback.is_some())
            .field("trees", &self.trees)
            .finish()
    }
}
