//! # Custody Core
//!
//! Core types and cryptographic primitives for the Instance Custody
//! service, which binds a hardware-identified compute instance to its
//! controlling principals.
//!
//! ## Key Concepts
//!
//! - **Instance**: a unit of compute named by an Ed25519 public key
//! - **Operator**: the first principal to bind itself to an instance;
//!   mints the owner delegation token
//! - **Owner**: the principal delegated workload control via a
//!   one-time token
//! - **Canonical payload**: the pinned byte serialization of a signed
//!   request body
//!
//! ## Invariants
//!
//! 1. Exactly one operator and one owner per instance, ever
//! 2. The owner token is consumable at most once
//! 3. Lifecycle state only advances forward

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod paths;
pub mod types;

pub use canonical::{canonical_bytes, CANONICAL_FORMAT_VERSION};
pub use crypto::{KeyPair, PublicKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
pub use error::{CustodyError, Result};
pub use paths::{validate_persist_dir, PathError};
pub use types::{
    ExposePayload, LifecycleRecord, LifecycleState, OwnerToken, OwnerTokenError,
    PrincipalBinding, WorkloadConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
