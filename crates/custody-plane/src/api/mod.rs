//! API module for the custody plane server

pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based tooling
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoint
        .route("/health", get(health))
        // Read endpoints
        .route("/instance/pubkey", get(handlers::get_instance_pubkey))
        .route("/instance", get(handlers::get_instance))
        // Registration endpoints
        .route("/operator/register", post(handlers::register_operator))
        .route("/owner/register", post(handlers::register_owner))
        // Workload endpoints
        .route("/workload/configure", post(handlers::configure_workload))
        .route("/workload/expose", post(handlers::expose_workload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
