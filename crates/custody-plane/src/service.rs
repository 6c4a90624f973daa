//! The custody service gateway
//!
//! [`CustodyService`] owns the instance identity, the record store, and
//! a per-instance transition lock. Handlers call its methods; each one
//! loads the current record, applies a pure transition from
//! [`crate::core::lifecycle`], and commits the result with a
//! compare-and-swap. The lock serializes transitions within this
//! process; the version check catches any writer that slipped past it,
//! so of two racing requests exactly one commits and the loser
//! re-evaluates against the committed state.

use custody_core::{ExposePayload, LifecycleRecord, WorkloadConfig, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::core::lifecycle::{self, TransitionError};
use crate::keys::InstanceIdentity;
use crate::storage::{RecordStore, StorageError};

/// Attempts at load-apply-swap before giving up
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Error returned by service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("State commit failed after {attempts} attempts")]
    CommitFailed { attempts: u32 },
}

/// Per-instance trust-establishment and authorization service
#[derive(Debug)]
pub struct CustodyService {
    identity: InstanceIdentity,
    store: Arc<dyn RecordStore>,
    config: ServiceConfig,
    // Serializes transitions so concurrent requests observe a
    // consistent record. The CAS version check is the backstop.
    transition_lock: Mutex<()>,
}

impl CustodyService {
    /// Create a service over the given identity, store, and config
    pub fn new(identity: InstanceIdentity, store: Arc<dyn RecordStore>, config: ServiceConfig) -> Self {
        Self {
            identity,
            store,
            config,
            transition_lock: Mutex::new(()),
        }
    }

    /// The service configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The raw instance public key
    pub fn instance_pubkey(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.identity.pubkey_bytes()
    }

    /// The instance public key, hex-encoded
    pub fn instance_pubkey_hex(&self) -> String {
        self.identity.pubkey_hex()
    }

    /// The current lifecycle record
    pub async fn record(&self) -> Result<LifecycleRecord, ServiceError> {
        Ok(self.store.load(&self.instance_pubkey()).await?)
    }

    /// Register the operator; returns the one-time owner token
    pub async fn register_operator(
        &self,
        pubkey: [u8; PUBLIC_KEY_LENGTH],
        signature: [u8; SIGNATURE_LENGTH],
    ) -> Result<String, ServiceError> {
        let instance = self.instance_pubkey();
        let endorsement = self.identity.endorse(&pubkey);
        self.commit(|record| {
            lifecycle::register_operator(record, &instance, pubkey, signature, endorsement)
        })
        .await
    }

    /// Register the owner, consuming the delegation token
    pub async fn register_owner(
        &self,
        pubkey: [u8; PUBLIC_KEY_LENGTH],
        signature: [u8; SIGNATURE_LENGTH],
        token: &str,
    ) -> Result<(), ServiceError> {
        let instance = self.instance_pubkey();
        let endorsement = self.identity.endorse(&pubkey);
        self.commit(|record| {
            lifecycle::register_owner(record, &instance, pubkey, signature, endorsement, token)
                .map(|next| (next, ()))
        })
        .await
    }

    /// Apply an owner-signed workload configuration
    pub async fn configure_workload(
        &self,
        config: WorkloadConfig,
        signature: [u8; SIGNATURE_LENGTH],
    ) -> Result<(), ServiceError> {
        let instance = self.instance_pubkey();
        let persist_root = self.config.persist_root.clone();
        self.commit(|record| {
            lifecycle::configure_workload(record, &instance, &config, signature, &persist_root)
                .map(|next| (next, ()))
        })
        .await
    }

    /// Apply an owner-signed workload exposure
    pub async fn expose_workload(
        &self,
        payload: ExposePayload,
        signature: [u8; SIGNATURE_LENGTH],
    ) -> Result<(), ServiceError> {
        let instance = self.instance_pubkey();
        self.commit(|record| {
            lifecycle::expose_workload(record, &instance, &payload, signature)
                .map(|next| (next, ()))
        })
        .await
    }

    /// Load-apply-swap loop for one transition
    ///
    /// Holds the transition lock across the cycle. A lost CAS or a
    /// transient storage error re-reads and re-applies, up to the
    /// attempt bound; transition rejections propagate immediately.
    async fn commit<T, F>(&self, apply: F) -> Result<T, ServiceError>
    where
        F: Fn(&LifecycleRecord) -> Result<(LifecycleRecord, T), TransitionError>,
    {
        let instance = self.instance_pubkey();
        let _guard = self.transition_lock.lock().await;

        let mut last_storage_err = None;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = match self.store.load(&instance).await {
                Ok(record) => record,
                Err(err) => {
                    warn!(attempt, error = %err, "Record load failed");
                    last_storage_err = Some(err);
                    continue;
                }
            };

            let (next, output) = apply(&current)?;

            match self
                .store
                .compare_and_swap(&instance, current.version, &next)
                .await
            {
                Ok(true) => {
                    info!(
                        state = ?next.state,
                        version = next.version,
                        "Applied lifecycle transition"
                    );
                    return Ok(output);
                }
                Ok(false) => {
                    warn!(attempt, version = current.version, "Lost commit race, retrying");
                    continue;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Record write failed");
                    last_storage_err = Some(err);
                    continue;
                }
            }
        }

        Err(match last_storage_err {
            Some(err) => ServiceError::Storage(err),
            None => ServiceError::CommitFailed {
                attempts: MAX_COMMIT_ATTEMPTS,
            },
        })
    }
}
