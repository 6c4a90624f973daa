//! Custody Plane Server Binary
//!
//! Runs the per-instance trust-establishment and authorization server.

use std::env;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use custody_plane::{
    create_router, AppState, CustodyService, FileStore, InstanceIdentity, ServiceConfig,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("CUSTODY_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = ServiceConfig::from_env();

    // Instance identity: generated on first boot, stable thereafter
    let identity = InstanceIdentity::load_or_generate(&config.storage_dir)
        .expect("Failed to load instance key");

    let store = Arc::new(FileStore::new(&config.storage_dir).expect("Failed to open record store"));

    info!(
        instance = %identity.pubkey_hex(),
        storage_dir = %config.storage_dir.display(),
        port = config.port,
        "Starting custody plane server"
    );

    let port = config.port;
    let service = Arc::new(CustodyService::new(identity, store, config));
    let state = Arc::new(AppState::new(service));

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Custody plane listening");

    axum::serve(listener, app).await.expect("Server error");
}
