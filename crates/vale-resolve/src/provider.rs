//! Collaborators the resolver asks for bytes: tree providers for hint sources
//! and the last-resort fallback.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use vale_store::FileTree;

use crate::error::{ResolveError, ResolveResult};

/// Turns a hint source identifier into the file trees found there.
///
/// Errors are never fatal to a resolution; the resolver treats them as "no
/// trees at that source".
#[async_trait]
pub trait TreeProvider: Send + Sync {
    async fn trees_from_source(&self, source: &str) -> ResolveResult<Vec<FileTree>>;
}

/// Last-resort byte provider, called with the raw hash bytes once every hint
/// source has failed.
pub trait FallbackProvider: Send + Sync {
    fn provide(&self, hash: &[u8]) -> Option<Bytes>;
}

impl<F> FallbackProvider for F
where
    F: Fn(&[u8]) -> Option<Bytes> + Send + Sync,
{
    fn provide(&self, hash: &[u8]) -> Option<Bytes> {
        self(hash)
    }
}

/// Provider serving fixed trees from memory.
#[derive(Debug, Default)]
pub struct StaticTreeProvider {
    sources: HashMap<String, Result<Vec<FileTree>, String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticTreeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `trees` for `source`.
    pub fn with_source(mut self, source: impl Into<String>, trees: Vec<FileTree>) -> Self {
        self.sources.insert(source.into(), Ok(trees));
        self
    }

    /// Fail every request for `source` with `reason`.
    pub fn with_failure(mut self, source: impl Into<String>, reason: impl Into<String>) -> Self {
        self.sources.insert(source.into(), Err(reason.into()));
        self
    }

    /// Sleep before answering, to simulate a slow download.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `trees_from_source` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeProvider for StaticTreeProvider {
    async fn trees_from_source(&self, source: &str) -> ResolveResult<Vec<FileTree>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.sources.get(source) {
            Some(Ok(trees)) => Ok(trees.clone()),
            Some(Err(reason)) => Err(ResolveError::Provider(reason.clone())),
            None => Err(ResolveError::Provider(format!("unknown source {source}"))),
        }
    }
}

/// Provider treating each source as a local path: a directory yields one
/// tree, a file yields one blob.
#[derive(Clone, Debug, Default)]
pub struct DirectoryTreeProvider {
    base: Option<PathBuf>,
}

impl DirectoryTreeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative source paths against `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn source_path(&self, source: &str) -> PathBuf {
        match &self.base {
            Some(base) => base.join(source),
            None => PathBuf::from(source),
        }
    }
}

#[async_trait]
impl TreeProvider for DirectoryTreeProvider {
    async fn trees_from_source(&self, source: &str) -> ResolveResult<Vec<FileTree>> {
        let path = self.source_path(source);
        if !path.exists() {
            return Err(ResolveError::Provider(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let tree = tokio::task::spawn_blocking(move || FileTree::load_from_path(&path))
            .await
            .map_err(|e| ResolveError::Provider(e.to_string()))??;
        Ok(vec![tree])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_serves_and_counts() {
        let provider = StaticTreeProvider::new()
            .with_source("a", vec![FileTree::blob(&b"x"[..])])
            .with_failure("b", "connection refused");

        assert_eq!(provider.trees_from_source("a").await.unwrap().len(), 1);
        let err = provider.trees_from_source("b").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(provider.trees_from_source("c").await.is_err());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn directory_provider_loads_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site/index.html"), b"<html/>").unwrap();

        let provider = DirectoryTreeProvider::with_base(dir.path());
        let trees = provider.trees_from_source("site").await.unwrap();
        assert_eq!(trees.len(), 1);
        let blobs = trees[0].enumerate_blobs_transitive();
        assert_eq!(blobs[0].path_string(), "index.html");
    }

    #[tokio::test]
    async fn directory_provider_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirectoryTreeProvider::with_base(dir.path());
        assert!(matches!(
            provider.trees_from_source("gone").await,
            Err(ResolveError::Provider(_))
        ));
    }

    #[test]
    fn closures_are_fallback_providers() {
        let fallback = |hash: &[u8]| (hash.len() == 2).then(|| Bytes::from_static(b"ok"));
        assert_eq!(fallback.provide(&[1, 2]).unwrap().as_ref(), b"ok");
        assert!(fallback.provide(&[1]).is_none());
    }
}
