//! Canonical payload serialization for signed requests
//!
//! The bytes an owner signs and the bytes the service verifies must
//! agree bit-for-bit, so the serialization is pinned rather than
//! taken from whatever the transport happened to deliver. The service
//! re-serializes the parsed payload through this module and verifies
//! the signature against that, never against the raw request body.
//!
//! ## Format, version 1
//!
//! - Compact JSON (`serde_json`, no whitespace), UTF-8
//! - Object fields in struct declaration order:
//!   `instance_pubkey`, `image`, `persist_dirs`, `port` for
//!   [`crate::types::WorkloadConfig`];
//!   `instance_pubkey`, `image` for [`crate::types::ExposePayload`]
//! - Byte arrays as lowercase hex strings
//!
//! Any change to field order, encoding, or whitespace is a new format
//! version and a breaking change to every existing client signature.

use crate::error::Result;
use serde::Serialize;

/// Version of the canonical signing format
pub const CANONICAL_FORMAT_VERSION: u32 = 1;

/// Serialize a payload to its canonical signed byte form
pub fn canonical_bytes<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(payload)?)
}
