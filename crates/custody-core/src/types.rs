//! Data model for the per-instance custody lifecycle

use crate::crypto::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::error::CustodyError;
use crate::paths::validate_persist_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The lifecycle state of an instance
///
/// States form a total order and only ever advance; there is no
/// de-registration. `WorkloadExposed` is the terminal reachable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unregistered,
    OperatorRegistered,
    OwnerRegistered,
    WorkloadConfigured,
    WorkloadExposed,
}

/// A principal (operator or owner) bound to an instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalBinding {
    /// The principal's public key
    #[serde(with = "hex_serde")]
    pub pubkey: [u8; PUBLIC_KEY_LENGTH],

    /// The principal's signature over the raw instance public key
    #[serde(with = "hex_serde")]
    pub signature: [u8; SIGNATURE_LENGTH],

    /// The instance's counter-signature over the principal public key
    #[serde(with = "hex_serde")]
    pub endorsement: [u8; SIGNATURE_LENGTH],

    /// When this principal registered
    pub registered_at: DateTime<Utc>,
}

/// Error returned when presenting an owner token fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnerTokenError {
    #[error("Invalid owner token")]
    Mismatch,

    #[error("Owner token already consumed")]
    AlreadyConsumed,
}

/// Single-use bearer credential bridging operator registration to
/// owner registration
///
/// Modeled as a one-shot capability (value plus consumed flag) so the
/// "already consumed" failure mode is explicit rather than inferred
/// from missing state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerToken {
    value: String,
    consumed: bool,
}

impl OwnerToken {
    /// Mint a fresh random token (32 random bytes, hex-encoded)
    pub fn mint() -> Self {
        Self {
            value: hex::encode(rand::random::<[u8; 32]>()),
            consumed: false,
        }
    }

    /// The bearer value handed to the operator at registration
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this token has already been spent
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Present a candidate value, returning the consumed token
    ///
    /// Succeeds at most once for the lifetime of the token.
    pub fn consume(&self, presented: &str) -> Result<OwnerToken, OwnerTokenError> {
        if self.consumed {
            return Err(OwnerTokenError::AlreadyConsumed);
        }
        if presented != self.value {
            return Err(OwnerTokenError::Mismatch);
        }
        Ok(Self {
            value: self.value.clone(),
            consumed: true,
        })
    }
}

/// The workload configuration submitted by the owner
///
/// This struct is also the canonical signing payload for
/// `configure_workload`; field order is part of the pinned canonical
/// format (see [`crate::canonical`]) and must not be reordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// The instance this configuration targets
    #[serde(with = "hex_serde")]
    pub instance_pubkey: [u8; PUBLIC_KEY_LENGTH],

    /// Container image reference
    pub image: String,

    /// Container-interior directories persisted across restarts
    pub persist_dirs: Vec<String>,

    /// Port the workload serves on once exposed
    pub port: u16,
}

impl WorkloadConfig {
    /// Validate this configuration for the given instance
    ///
    /// Checks, in order: instance binding, image presence, port range,
    /// and every persist directory against the path-safety rules. Any
    /// failure invalidates the whole configuration.
    pub fn validate(
        &self,
        instance_pubkey: &[u8; PUBLIC_KEY_LENGTH],
        persist_root: &Path,
    ) -> Result<(), CustodyError> {
        if &self.instance_pubkey != instance_pubkey {
            return Err(CustodyError::InvalidConfig(
                "Instance pubkey mismatch".to_string(),
            ));
        }
        if self.image.is_empty() {
            return Err(CustodyError::InvalidConfig("Missing image".to_string()));
        }
        if self.port == 0 {
            return Err(CustodyError::InvalidConfig(
                "Invalid port: must be between 1 and 65535".to_string(),
            ));
        }
        for dir in &self.persist_dirs {
            validate_persist_dir(dir, persist_root)
                .map_err(|_| CustodyError::InvalidConfig("Invalid directory path".to_string()))?;
        }
        Ok(())
    }
}

/// The canonical signing payload for `expose_workload`
///
/// Field order is part of the pinned canonical format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposePayload {
    /// The instance whose workload is exposed
    #[serde(with = "hex_serde")]
    pub instance_pubkey: [u8; PUBLIC_KEY_LENGTH],

    /// Container image reference; must match the stored configuration
    pub image: String,
}

/// The full per-instance lifecycle record, the aggregate root
///
/// Created implicitly in the `Unregistered` state on first observation
/// of an instance and mutated only through the four lifecycle
/// transitions. `version` increments on every committed transition and
/// is the compare-and-swap token for the record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub state: LifecycleState,
    pub operator: Option<PrincipalBinding>,
    pub owner_token: Option<OwnerToken>,
    pub owner: Option<PrincipalBinding>,
    pub workload: Option<WorkloadConfig>,
    pub exposed: bool,
    pub version: u64,
}

impl LifecycleRecord {
    /// The default record for an instance never seen before
    pub fn unregistered() -> Self {
        Self {
            state: LifecycleState::Unregistered,
            operator: None,
            owner_token: None,
            owner: None,
            workload: None,
            exposed: false,
            version: 0,
        }
    }
}

impl Default for LifecycleRecord {
    fn default() -> Self {
        Self::unregistered()
    }
}

/// Serde serialization and deserialization for hex-encoded byte arrays
pub mod hex_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let decoded = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let len = decoded.len();
        decoded
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("Expected {} bytes, got {}", N, len)))
    }
}
