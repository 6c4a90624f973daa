//! Read-Only Instance Handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use custody_core::{LifecycleState, PrincipalBinding, WorkloadConfig};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// Response carrying the instance public key
#[derive(Debug, Serialize)]
pub struct InstancePubkeyResponse {
    /// Hex-encoded Ed25519 public key
    pub pubkey: String,
}

/// Read model of a registered principal
///
/// Exposes the binding's public material only.
#[derive(Debug, Serialize)]
pub struct PrincipalView {
    pub pubkey: String,
    pub endorsement: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&PrincipalBinding> for PrincipalView {
    fn from(binding: &PrincipalBinding) -> Self {
        Self {
            pubkey: hex::encode(binding.pubkey),
            endorsement: hex::encode(binding.endorsement),
            registered_at: binding.registered_at,
        }
    }
}

/// Read model of the instance lifecycle record
///
/// The owner token never appears here.
#[derive(Debug, Serialize)]
pub struct InstanceView {
    pub pubkey: String,
    pub state: LifecycleState,
    pub operator: Option<PrincipalView>,
    pub owner: Option<PrincipalView>,
    pub workload: Option<WorkloadConfig>,
    pub exposed: bool,
}

/// The instance public key
///
/// GET /instance/pubkey
pub async fn get_instance_pubkey(
    State(state): State<Arc<AppState>>,
) -> Json<InstancePubkeyResponse> {
    Json(InstancePubkeyResponse {
        pubkey: state.service.instance_pubkey_hex(),
    })
}

/// The instance lifecycle record
///
/// GET /instance
pub async fn get_instance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InstanceView>, ApiError> {
    let record = state.service.record().await?;

    Ok(Json(InstanceView {
        pubkey: state.service.instance_pubkey_hex(),
        state: record.state,
        operator: record.operator.as_ref().map(PrincipalView::from),
        owner: record.owner.as_ref().map(PrincipalView::from),
        workload: record.workload,
        exposed: record.exposed,
    }))
}
