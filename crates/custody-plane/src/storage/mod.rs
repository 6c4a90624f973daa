//! Storage abstraction for lifecycle records
//!
//! This module provides a trait-based abstraction over record
//! persistence, with an in-memory backend for tests and a durable
//! file-backed backend for deployment. Records are keyed by instance
//! public key and carry a version used for compare-and-swap: every
//! transition is committed as an atomic read-modify-write, so a crash
//! between accepting a request and acknowledging it can never leave a
//! record inconsistent with a response already sent.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use custody_core::{LifecycleRecord, PUBLIC_KEY_LENGTH};
use std::fmt::Debug;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Storage backend trait for per-instance lifecycle records
///
/// Implementations must be thread-safe. Durable backends must not
/// report a successful swap before the record is on stable storage.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Load the record for an instance
    ///
    /// An instance never seen before yields the default
    /// `Unregistered` record at version 0.
    async fn load(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
    ) -> Result<LifecycleRecord, StorageError>;

    /// Atomically replace the record if its current version matches
    ///
    /// Returns `false` without writing when the stored version differs
    /// from `expected_version`.
    async fn compare_and_swap(
        &self,
        instance: &[u8; PUBLIC_KEY_LENGTH],
        expected_version: u64,
        record: &LifecycleRecord,
    ) -> Result<bool, StorageError>;
}
