//! Custody Plane Server
//!
//! The Custody Plane is the per-instance trust-establishment and
//! authorization service. It:
//! - Binds the instance's cryptographic identity to exactly one operator
//! - Delegates control to exactly one owner via a one-time token
//! - Gates workload configuration and exposure behind owner-signed
//!   requests
//!
//! ## Lifecycle
//!
//! Unregistered → OperatorRegistered → OwnerRegistered →
//! WorkloadConfigured → WorkloadExposed, forward-only, with every
//! transition applied as an atomic compare-and-swap against durable
//! storage.
//!
//! ## API Endpoints
//!
//! - `GET  /health` - Liveness check
//! - `GET  /instance/pubkey` - The instance public key (hex)
//! - `GET  /instance` - Read model of the lifecycle record
//! - `POST /operator/register` - Bind the operator, returns the owner token
//! - `POST /owner/register` - Bind the owner (one-time token required)
//! - `POST /workload/configure` - Owner-signed workload configuration
//! - `POST /workload/expose` - Owner-signed workload exposure

pub mod api;
pub mod config;
pub mod core;
pub mod keys;
pub mod service;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::ServiceConfig;
pub use crate::core::lifecycle::TransitionError;
pub use keys::InstanceIdentity;
pub use service::{CustodyService, ServiceError};
pub use storage::{FileStore, MemoryStore, RecordStore, StorageError};
