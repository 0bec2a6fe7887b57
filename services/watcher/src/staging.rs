//! Transient staging store for downloaded band assets.
//!
//! Band bytes live here only for the duration of one pipeline run, keyed
//! under a per-run UUID so concurrent runs never collide. The backing store
//! is a local directory, an S3 bucket, or process memory.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::{debug, instrument};
use uuid::Uuid;

use watch_common::{WatchError, WatchResult};

use crate::config::StagingSection;

/// Staging store holding band assets between download and tiling.
#[derive(Clone)]
pub struct BandStaging {
    store: Arc<dyn ObjectStore>,
}

impl BandStaging {
    /// Build a staging store from configuration.
    pub fn from_config(config: &StagingSection) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config.backend.as_str() {
            "filesystem" => {
                std::fs::create_dir_all(&config.root).with_context(|| {
                    format!("Failed to create staging directory: {}", config.root)
                })?;
                let fs = LocalFileSystem::new_with_prefix(&config.root)
                    .with_context(|| format!("Failed to open staging root: {}", config.root))?;
                Arc::new(fs)
            }
            "s3" => {
                if config.bucket.is_empty() {
                    bail!("S3 staging backend requires a bucket");
                }
                let s3 = AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .build()
                    .context("Failed to create S3 staging client")?;
                Arc::new(s3)
            }
            "memory" => Arc::new(InMemory::new()),
            other => bail!("Unknown staging backend: {}", other),
        };

        Ok(Self { store })
    }

    /// In-memory staging store, used by tests.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
        }
    }

    /// Staging key for one run's band asset.
    pub fn band_key(run_id: &Uuid, band: &str) -> String {
        format!("bands/{}/{}.tif", run_id, band)
    }

    /// Write band bytes under a key.
    #[instrument(skip(self, data), fields(key = %key))]
    pub async fn put(&self, key: &str, data: Bytes) -> WatchResult<()> {
        let location = Path::from(key);
        debug!(size = data.len(), "Staging band asset");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| WatchError::StorageFailure(format!("Failed to stage {}: {}", key, e)))?;

        Ok(())
    }

    /// Read band bytes back for tiling.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &str) -> WatchResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| WatchError::StorageFailure(format!("Failed to read {}: {}", key, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| WatchError::StorageFailure(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read staged band asset");
        Ok(bytes)
    }

    /// Remove a staged asset at the end of a run.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn delete(&self, key: &str) -> WatchResult<()> {
        let location = Path::from(key);

        self.store
            .delete(&location)
            .await
            .map_err(|e| WatchError::StorageFailure(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }
}
