use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vale_types::ContentHash;

use crate::error::{StoreError, StoreResult};
use crate::flight::SingleFlight;
use crate::traits::{BlobCache, FetchFuture};

/// Blob cache backed by a directory, one file per hex-encoded hash.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers never observe a partially written blob. A blob that
/// cannot be written is still handed back to the caller.
#[derive(Debug)]
pub struct FileSystemBlobCache {
    root: PathBuf,
    flights: SingleFlight<ContentHash, Bytes>,
}

enum FlightError {
    Miss,
    Store(StoreError),
}

impl From<StoreError> for FlightError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl FileSystemBlobCache {
    /// Open a cache rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            flights: SingleFlight::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `hash`.
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.to_hex())
    }

    async fn read(&self, hash: &ContentHash) -> StoreResult<Option<Bytes>> {
        match tokio::fs::read(self.blob_path(hash)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, hash: &ContentHash, bytes: Bytes) -> StoreResult<()> {
        let root = self.root.clone();
        let target = self.blob_path(hash);
        let hash = *hash;
        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| StoreError::Persist {
                hash,
                reason: e.error.to_string(),
            })?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl BlobCache for FileSystemBlobCache {
    async fn get(&self, hash: &ContentHash) -> StoreResult<Option<Bytes>> {
        self.read(hash).await
    }

    async fn get_or_fetch<'a>(
        &'a self,
        hash: &'a ContentHash,
        fetch: FetchFuture<'a>,
    ) -> StoreResult<Option<Bytes>> {
        if let Some(bytes) = self.read(hash).await? {
            debug!(hash = %hash.short_hex(), "disk cache hit");
            return Ok(Some(bytes));
        }

        let outcome = self
            .flights
            .get_or_try_init(*hash, move || async move {
                // An earlier flight may have finished between the read above
                // and acquiring the cell.
                if let Some(bytes) = self.read(hash).await? {
                    return Ok(bytes);
                }
                let bytes = fetch.await.ok_or(FlightError::Miss)?;
                match self.write(hash, bytes.clone()).await {
                    Ok(()) => debug!(hash = %hash.short_hex(), len = bytes.len(), "stored blob"),
                    Err(e) => warn!(hash = %hash.short_hex(), error = %e, "failed to persist blob"),
                }
                Ok::<_, FlightError>(bytes)
            })
            .await;
        self.flights.remove(hash);

        match outcome {
            Ok(bytes) => Ok(Some(bytes)),
            Err(FlightError::Miss) => Ok(None),
            Err(FlightError::Store(e)) => Err(e),
        }
    }
}
