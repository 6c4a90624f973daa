//! File-backed durable storage backend
//!
//! One JSON document per instance under the store root, named by the
//! hex-encoded instance public key. Writes go to a temp file, are
//! fsynced, then renamed into place, so a crash mid-write leaves
//! either the old record or the new one, never a torn file. A restart
//! without explicit reset reproduces the exact prior records.

use async_trait::async_trait;
use custody_core::{LifecycleRecord, PUBLIC_KEY_LENGTH};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::{RecordStore, StorageError};

/// Durable file-backed record store
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    // Serializes the read-compare-write cycle so CAS semantics hold
    // even without the gateway's per-instance lock.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store rooted at `root`, creating the directory if
    /// needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, instance: &[u8; PUBLIC_KEY_LENGTH]) -> PathBuf {
        self.root.join(format!("{}.json", hex::encode(instance)))
    }

    async fn read_record(&self, path: &Path) -> Result<LifecycleRecord, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Ok(LifecycleRecord::unregistered())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn load(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
    ) -> Result<LifecycleRecord, StorageError> {
        self.read_record(&self.record_path(instance)).await
    }

    async fn compare_and_swap(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
        expected_version: u64,
        record: &LifecycleRecord,
    ) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;

        let path = self.record_path(instance);
        let current = self.read_record(&path).await?;
        if current.version != expected_version {
            return Ok(false);
        }

        let data = serde_json::to_vec_pretty(record)?;

        // Atomic write: temp file, fsync, then rename into place
        let temp_path = path.with_extension("tmp");
        let mut temp_file = tokio::fs::File::create(&temp_path).await?;
        temp_file.write_all(&data).await?;
        temp_file.sync_all().await?;
        drop(temp_file);
        tokio::fs::rename(&temp_path, &path).await?;

        // The rename is only durable once the directory entry is synced
        tokio::fs::File::open(&self.root).await?.sync_all().await?;

        info!(
            instance = %hex::encode(instance),
            state = ?record.state,
            version = record.version,
            "Persisted lifecycle record"
        );
        Ok(true)
    }
}
