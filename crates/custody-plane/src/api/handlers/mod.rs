//! API request handlers

pub mod read;
pub mod register;
pub mod workload;

use crate::service::CustodyService;
use std::sync::Arc;

pub use read::{get_instance, get_instance_pubkey, InstancePubkeyResponse, InstanceView};
pub use register::{
    register_operator, register_owner, RegisterOperatorResponse, RegisterOwnerResponse,
    RegisterRequest,
};
pub use workload::{configure_workload, expose_workload, WorkloadResponse};

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub service: Arc<CustodyService>,
}

impl AppState {
    pub fn new(service: Arc<CustodyService>) -> Self {
        Self { service }
    }
}
