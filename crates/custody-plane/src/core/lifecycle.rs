//! The per-instance authorization state machine
//!
//! This module contains the security-critical transition logic: every
//! way an instance's lifecycle record can change is one of the four
//! functions here, each a pure `record -> record` step that enforces
//! its preconditions and never retreats the state. The gateway applies
//! the returned record through a compare-and-swap, so a transition
//! either commits whole or not at all.

use chrono::Utc;
use custody_core::{
    canonical_bytes, ExposePayload, LifecycleRecord, LifecycleState, OwnerToken,
    PrincipalBinding, PublicKey, WorkloadConfig, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Error returned when a lifecycle transition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Signature invalid, required prior registration missing, or
    /// delegation token invalid/consumed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The precondition state no longer holds because an irreversible
    /// transition already occurred
    #[error("{0}")]
    Conflict(String),

    /// Structurally authorized request with invalid payload content
    #[error("{0}")]
    Validation(String),
}

/// Verify a principal's detached signature, mapping failures to
/// `Unauthorized` with a role-describing message
fn verify_principal_signature(
    pubkey: &[u8; PUBLIC_KEY_LENGTH],
    message: &[u8],
    signature: &[u8; SIGNATURE_LENGTH],
    role: &str,
) -> Result<PublicKey, TransitionError> {
    let key = PublicKey::from_bytes(pubkey)
        .map_err(|_| TransitionError::Unauthorized(format!("Invalid {} public key", role)))?;
    key.verify(message, signature).map_err(|_| {
        warn!(role, pubkey = %hex::encode(pubkey), "Rejected invalid signature");
        TransitionError::Unauthorized(format!("Invalid {} signature", role))
    })?;
    Ok(key)
}

/// Bind the operator to an unregistered instance
///
/// Verifies the operator's signature over the raw instance public key,
/// mints the one-time owner token, and advances the state. Returns the
/// next record and the token value to hand back to the operator.
pub fn register_operator(
    record: &LifecycleRecord,
    instance_pubkey: &[u8; PUBLIC_KEY_LENGTH],
    pubkey: [u8; PUBLIC_KEY_LENGTH],
    signature: [u8; SIGNATURE_LENGTH],
    endorsement: [u8; SIGNATURE_LENGTH],
) -> Result<(LifecycleRecord, String), TransitionError> {
    if record.state != LifecycleState::Unregistered {
        return Err(TransitionError::Conflict(
            "Operator already registered".to_string(),
        ));
    }

    verify_principal_signature(&pubkey, instance_pubkey, &signature, "operator")?;

    let token = OwnerToken::mint();
    let token_value = token.value().to_string();

    let next = LifecycleRecord {
        state: LifecycleState::OperatorRegistered,
        operator: Some(PrincipalBinding {
            pubkey,
            signature,
            endorsement,
            registered_at: Utc::now(),
        }),
        owner_token: Some(token),
        version: record.version + 1,
        ..record.clone()
    };
    Ok((next, token_value))
}

/// Bind the owner, consuming the one-time delegation token
pub fn register_owner(
    record: &LifecycleRecord,
    instance_pubkey: &[u8; PUBLIC_KEY_LENGTH],
    pubkey: [u8; PUBLIC_KEY_LENGTH],
    signature: [u8; SIGNATURE_LENGTH],
    endorsement: [u8; SIGNATURE_LENGTH],
    presented_token: &str,
) -> Result<LifecycleRecord, TransitionError> {
    let Some(token) = &record.owner_token else {
        return Err(TransitionError::Unauthorized(
            "Operator not registered".to_string(),
        ));
    };
    let consumed_token = token
        .consume(presented_token)
        .map_err(|e| TransitionError::Unauthorized(e.to_string()))?;

    verify_principal_signature(&pubkey, instance_pubkey, &signature, "owner")?;

    let next = LifecycleRecord {
        state: LifecycleState::OwnerRegistered,
        owner_token: Some(consumed_token),
        owner: Some(PrincipalBinding {
            pubkey,
            signature,
            endorsement,
            registered_at: Utc::now(),
        }),
        version: record.version + 1,
        ..record.clone()
    };
    Ok(next)
}

/// Set or replace the workload configuration
///
/// The signature is verified against the canonical payload bytes with
/// the registered owner key. Re-configuration is allowed until the
/// workload is exposed; after exposure the record is immutable.
pub fn configure_workload(
    record: &LifecycleRecord,
    instance_pubkey: &[u8; PUBLIC_KEY_LENGTH],
    config: &WorkloadConfig,
    signature: [u8; SIGNATURE_LENGTH],
    persist_root: &Path,
) -> Result<LifecycleRecord, TransitionError> {
    let Some(owner) = &record.owner else {
        return Err(TransitionError::Unauthorized(
            "Owner not registered".to_string(),
        ));
    };

    let message = canonical_bytes(config)
        .map_err(|e| TransitionError::Validation(format!("Invalid payload: {}", e)))?;
    verify_principal_signature(&owner.pubkey, &message, &signature, "owner")?;

    if record.state == LifecycleState::WorkloadExposed {
        return Err(TransitionError::Conflict(
            "Workload already exposed".to_string(),
        ));
    }

    config
        .validate(instance_pubkey, persist_root)
        .map_err(|e| TransitionError::Validation(e.to_string()))?;

    let next = LifecycleRecord {
        state: LifecycleState::WorkloadConfigured,
        workload: Some(config.clone()),
        version: record.version + 1,
        ..record.clone()
    };
    Ok(next)
}

/// Expose the configured workload
///
/// Requires a prior configuration; the payload must name this instance
/// and the configured image.
pub fn expose_workload(
    record: &LifecycleRecord,
    instance_pubkey: &[u8; PUBLIC_KEY_LENGTH],
    payload: &ExposePayload,
    signature: [u8; SIGNATURE_LENGTH],
) -> Result<LifecycleRecord, TransitionError> {
    // Checked before authorization so a premature expose is always a
    // validation failure, owner or no owner.
    let Some(workload) = &record.workload else {
        return Err(TransitionError::Validation(
            "Workload not configured".to_string(),
        ));
    };
    let Some(owner) = &record.owner else {
        return Err(TransitionError::Unauthorized(
            "Owner not registered".to_string(),
        ));
    };

    let message = canonical_bytes(payload)
        .map_err(|e| TransitionError::Validation(format!("Invalid payload: {}", e)))?;
    verify_principal_signature(&owner.pubkey, &message, &signature, "owner")?;

    if &payload.instance_pubkey != instance_pubkey {
        return Err(TransitionError::Unauthorized(
            "Instance pubkey mismatch".to_string(),
        ));
    }
    if payload.image != workload.image {
        return Err(TransitionError::Unauthorized(
            "Image mismatch with stored configuration".to_string(),
        ));
    }
    if record.exposed {
        return Err(TransitionError::Validation(
            "Workload already exposed".to_string(),
        ));
    }

    let next = LifecycleRecord {
        state: LifecycleState::WorkloadExposed,
        exposed: true,
        version: record.version + 1,
        ..record.clone()
    };
    Ok(next)
}
