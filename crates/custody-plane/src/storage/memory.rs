//! In-memory storage backend
//!
//! Default backend for tests and development. Data is lost on restart;
//! deployments use [`super::FileStore`].

use async_trait::async_trait;
use custody_core::{LifecycleRecord, PUBLIC_KEY_LENGTH};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

use super::{RecordStore, StorageError};

/// In-memory record store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<[u8; PUBLIC_KEY_LENGTH], LifecycleRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
    ) -> Result<LifecycleRecord, StorageError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(instance)
            .cloned()
            .unwrap_or_else(LifecycleRecord::unregistered))
    }

    async fn compare_and_swap(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
        expected_version: u64,
        record: &LifecycleRecord,
    ) -> Result<bool, StorageError> {
        let mut records = self.records.write().unwrap();
        let current_version = records.get(instance).map_or(0, |r| r.version);
        if current_version != expected_version {
            return Ok(false);
        }

        info!(
            instance = %hex::encode(instance),
            state = ?record.state,
            version = record.version,
            "Committed lifecycle record"
        );
        records.insert(*instance, record.clone());
        Ok(true)
    }
}
