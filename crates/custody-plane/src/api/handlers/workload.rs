//! Workload Configuration and Exposure Handlers
//!
//! Both endpoints take the payload as the request body and the owner's
//! signature in the `x-signature` header. The signature is verified
//! against the canonical encoding of the parsed payload, so request
//! bytes that differ only in JSON formatting verify the same and a
//! payload altered after signing does not.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use custody_core::{ExposePayload, WorkloadConfig, SIGNATURE_LENGTH};

use crate::api::error::ApiError;
use crate::api::extract::Payload;
use crate::api::handlers::register::decode_signature;
use crate::api::handlers::AppState;

/// Header carrying the owner's detached signature
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Response from workload operations
#[derive(Debug, Serialize)]
pub struct WorkloadResponse {
    pub status: String,
}

fn signature_header(headers: &HeaderMap) -> Result<[u8; SIGNATURE_LENGTH], ApiError> {
    let value = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing signature".into()))?;
    decode_signature(value)
}

/// Configure the workload
///
/// POST /workload/configure
///
/// Owner-signed. May be repeated to replace the configuration until
/// the workload is exposed.
pub async fn configure_workload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Payload(config): Payload<WorkloadConfig>,
) -> Result<Json<WorkloadResponse>, ApiError> {
    let signature = signature_header(&headers)?;

    state.service.configure_workload(config, signature).await?;
    info!("Workload configured");

    Ok(Json(WorkloadResponse {
        status: "configured".into(),
    }))
}

/// Expose the configured workload
///
/// POST /workload/expose
pub async fn expose_workload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Payload(payload): Payload<ExposePayload>,
) -> Result<Json<WorkloadResponse>, ApiError> {
    let signature = signature_header(&headers)?;

    state.service.expose_workload(payload, signature).await?;
    info!("Workload exposed");

    Ok(Json(WorkloadResponse {
        status: "exposed".into(),
    }))
}
