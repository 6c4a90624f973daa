//! Principal Registration Handlers
//!
//! Handles operator and owner registration. Both bind a hex-encoded
//! Ed25519 public key, proven by a signature over the raw instance
//! public key bytes.

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use custody_core::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

use crate::api::error::ApiError;
use crate::api::extract::Payload;
use crate::api::handlers::AppState;

/// Header carrying the one-time owner delegation token
pub const TOKEN_HEADER: &str = "x-token";

/// Request to register a principal key
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Hex-encoded Ed25519 public key (32 bytes)
    pub pubkey: String,

    /// Hex-encoded signature over the raw instance public key bytes
    pub signature: String,
}

/// Response from operator registration
#[derive(Debug, Serialize)]
pub struct RegisterOperatorResponse {
    pub status: String,

    /// One-time token the operator hands to the owner out of band
    pub owner_token: String,
}

/// Response from owner registration
#[derive(Debug, Serialize)]
pub struct RegisterOwnerResponse {
    pub status: String,
}

/// Decode a hex-encoded 32-byte public key
pub(crate) fn decode_pubkey(hex_key: &str) -> Result<[u8; PUBLIC_KEY_LENGTH], ApiError> {
    let bytes = hex::decode(hex_key)
        .map_err(|e| ApiError::BadRequest(format!("Invalid hex public key: {}", e)))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        ApiError::BadRequest(format!(
            "Invalid key length: expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            v.len()
        ))
    })
}

/// Decode a hex-encoded 64-byte signature
pub(crate) fn decode_signature(hex_sig: &str) -> Result<[u8; SIGNATURE_LENGTH], ApiError> {
    let bytes = hex::decode(hex_sig)
        .map_err(|e| ApiError::BadRequest(format!("Invalid hex signature: {}", e)))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        ApiError::BadRequest(format!(
            "Invalid signature length: expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            v.len()
        ))
    })
}

/// Register the operator
///
/// POST /operator/register
///
/// First caller with a valid signature wins; the response carries the
/// one-time owner token, returned exactly once.
pub async fn register_operator(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Json<RegisterOperatorResponse>, ApiError> {
    let pubkey = decode_pubkey(&request.pubkey)?;
    let signature = decode_signature(&request.signature)?;

    let owner_token = state.service.register_operator(pubkey, signature).await?;
    info!(pubkey = %request.pubkey, "Operator registered");

    Ok(Json(RegisterOperatorResponse {
        status: "registered".into(),
        owner_token,
    }))
}

/// Register the owner
///
/// POST /owner/register
///
/// Requires the one-time token from operator registration in the
/// `x-token` header.
pub async fn register_owner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Json<RegisterOwnerResponse>, ApiError> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing owner token".into()))?;

    let pubkey = decode_pubkey(&request.pubkey)?;
    let signature = decode_signature(&request.signature)?;

    state
        .service
        .register_owner(pubkey, signature, token)
        .await?;
    info!(pubkey = %request.pubkey, "Owner registered");

    Ok(Json(RegisterOwnerResponse {
        status: "registered".into(),
    }))
}
