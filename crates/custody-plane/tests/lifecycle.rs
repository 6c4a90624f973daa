//! Integration Tests for the Custody Plane
//!
//! These tests verify service behavior across the whole lifecycle:
//! - Operator and owner registration ordering
//! - One-time owner token semantics
//! - Workload configuration and exposure gating
//! - Durability across restart and concurrency guarantees

use custody_core::{
    canonical_bytes, ExposePayload, KeyPair, LifecycleState, PublicKey, WorkloadConfig,
};
use custody_plane::{
    CustodyService, FileStore, InstanceIdentity, MemoryStore, ServiceConfig, ServiceError,
    TransitionError,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

fn memory_service() -> CustodyService {
    CustodyService::new(
        InstanceIdentity::generate(),
        Arc::new(MemoryStore::new()),
        ServiceConfig::default(),
    )
}

fn file_service(dir: &Path) -> CustodyService {
    CustodyService::new(
        InstanceIdentity::load_or_generate(dir).expect("instance key"),
        Arc::new(FileStore::new(dir).expect("file store")),
        ServiceConfig {
            storage_dir: dir.to_path_buf(),
            ..ServiceConfig::default()
        },
    )
}

fn nginx_config(instance: [u8; 32]) -> WorkloadConfig {
    WorkloadConfig {
        instance_pubkey: instance,
        image: "nginx:latest".to_string(),
        persist_dirs: vec![
            "/etc/nginx/conf.d".to_string(),
            "/var/log/nginx".to_string(),
        ],
        port: 8080,
    }
}

fn sign_canonical<T: Serialize>(key: &KeyPair, payload: &T) -> [u8; 64] {
    key.sign(&canonical_bytes(payload).expect("canonical encoding"))
}

/// Drive a service to the owner-registered state; returns the owner key
async fn register_owner(service: &CustodyService) -> KeyPair {
    let instance = service.instance_pubkey();
    let operator = KeyPair::generate();
    let owner = KeyPair::generate();

    let token = service
        .register_operator(operator.public_key_bytes(), operator.sign(&instance))
        .await
        .expect("operator registration");
    service
        .register_owner(owner.public_key_bytes(), owner.sign(&instance), &token)
        .await
        .expect("owner registration");
    owner
}

fn assert_unauthorized<T: std::fmt::Debug>(result: Result<T, ServiceError>) {
    assert!(
        matches!(
            result,
            Err(ServiceError::Transition(TransitionError::Unauthorized(_)))
        ),
        "expected unauthorized, got {:?}",
        result
    );
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle_happy_path() {
    let service = memory_service();
    let instance = service.instance_pubkey();

    let operator = KeyPair::generate();
    let owner = KeyPair::generate();

    // Operator binds first, proving possession of its key
    let token = service
        .register_operator(operator.public_key_bytes(), operator.sign(&instance))
        .await
        .unwrap();
    assert!(!token.is_empty());

    let record = service.record().await.unwrap();
    assert_eq!(record.state, LifecycleState::OperatorRegistered);
    let binding = record.operator.as_ref().unwrap();
    assert_eq!(binding.pubkey, operator.public_key_bytes());

    // The instance endorsed the operator key
    let instance_key = PublicKey::from_bytes(&instance).unwrap();
    assert!(instance_key
        .verify(&binding.pubkey, &binding.endorsement)
        .is_ok());

    // Owner redeems the token
    service
        .register_owner(owner.public_key_bytes(), owner.sign(&instance), &token)
        .await
        .unwrap();

    // Owner configures, then exposes
    let config = nginx_config(instance);
    service
        .configure_workload(config.clone(), sign_canonical(&owner, &config))
        .await
        .unwrap();

    let payload = ExposePayload {
        instance_pubkey: instance,
        image: config.image.clone(),
    };
    service
        .expose_workload(payload.clone(), sign_canonical(&owner, &payload))
        .await
        .unwrap();

    let record = service.record().await.unwrap();
    assert_eq!(record.state, LifecycleState::WorkloadExposed);
    assert!(record.exposed);
    assert_eq!(record.workload.unwrap(), config);
}

#[tokio::test]
async fn test_operator_registration_is_permanent() {
    let service = memory_service();
    let instance = service.instance_pubkey();

    let first = KeyPair::generate();
    service
        .register_operator(first.public_key_bytes(), first.sign(&instance))
        .await
        .unwrap();

    let second = KeyPair::generate();
    let result = service
        .register_operator(second.public_key_bytes(), second.sign(&instance))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Transition(TransitionError::Conflict(_)))
    ));

    // The original binding is untouched
    let record = service.record().await.unwrap();
    assert_eq!(record.operator.unwrap().pubkey, first.public_key_bytes());
}

#[tokio::test]
async fn test_owner_registration_requires_operator() {
    let service = memory_service();
    let instance = service.instance_pubkey();

    let owner = KeyPair::generate();
    let result = service
        .register_owner(owner.public_key_bytes(), owner.sign(&instance), "any-token")
        .await;
    assert_unauthorized(result);
}

#[tokio::test]
async fn test_owner_token_is_single_use() {
    let service = memory_service();
    let instance = service.instance_pubkey();

    let operator = KeyPair::generate();
    let token = service
        .register_operator(operator.public_key_bytes(), operator.sign(&instance))
        .await
        .unwrap();

    let owner = KeyPair::generate();
    service
        .register_owner(owner.public_key_bytes(), owner.sign(&instance), &token)
        .await
        .unwrap();

    // Redeeming the same token again fails, even with a valid signature
    let late = KeyPair::generate();
    let result = service
        .register_owner(late.public_key_bytes(), late.sign(&instance), &token)
        .await;
    assert_unauthorized(result);
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let service = memory_service();
    let instance = service.instance_pubkey();

    let operator = KeyPair::generate();
    service
        .register_operator(operator.public_key_bytes(), operator.sign(&instance))
        .await
        .unwrap();

    let owner = KeyPair::generate();
    let result = service
        .register_owner(
            owner.public_key_bytes(),
            owner.sign(&instance),
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .await;
    assert_unauthorized(result);
}

#[tokio::test]
async fn test_reconfigure_replaces_until_exposed() {
    let service = memory_service();
    let instance = service.instance_pubkey();
    let owner = register_owner(&service).await;

    let first = nginx_config(instance);
    service
        .configure_workload(first.clone(), sign_canonical(&owner, &first))
        .await
        .unwrap();

    let mut second = first.clone();
    second.image = "nginx:1.27".to_string();
    second.port = 9090;
    service
        .configure_workload(second.clone(), sign_canonical(&owner, &second))
        .await
        .unwrap();

    let record = service.record().await.unwrap();
    assert_eq!(record.workload.unwrap(), second);

    // Exposure freezes the configuration
    let payload = ExposePayload {
        instance_pubkey: instance,
        image: second.image.clone(),
    };
    service
        .expose_workload(payload.clone(), sign_canonical(&owner, &payload))
        .await
        .unwrap();

    let result = service
        .configure_workload(first.clone(), sign_canonical(&owner, &first))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Transition(TransitionError::Conflict(_)))
    ));
}

#[tokio::test]
async fn test_signature_verifies_across_transport_reencoding() {
    let service = memory_service();
    let instance = service.instance_pubkey();
    let owner = register_owner(&service).await;

    // Sign, then push the payload through a JSON round trip as a
    // transport would before it reaches the service
    let config = nginx_config(instance);
    let signature = sign_canonical(&owner, &config);

    let reparsed: WorkloadConfig =
        serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    service.configure_workload(reparsed, signature).await.unwrap();
}

// =============================================================================
// Durability Tests
// =============================================================================

#[tokio::test]
async fn test_lifecycle_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let operator = KeyPair::generate();
    let owner = KeyPair::generate();
    let instance;
    let token;

    {
        let service = file_service(dir.path());
        instance = service.instance_pubkey();
        token = service
            .register_operator(operator.public_key_bytes(), operator.sign(&instance))
            .await
            .unwrap();
    }

    // Restart: same storage dir, fresh process state
    let service = file_service(dir.path());
    assert_eq!(service.instance_pubkey(), instance);

    let record = service.record().await.unwrap();
    assert_eq!(record.state, LifecycleState::OperatorRegistered);
    assert_eq!(record.operator.unwrap().pubkey, operator.public_key_bytes());

    // The lifecycle continues where it left off
    service
        .register_owner(owner.public_key_bytes(), owner.sign(&instance), &token)
        .await
        .unwrap();

    // And a consumed token stays consumed across another restart
    let service = file_service(dir.path());
    let late = KeyPair::generate();
    let result = service
        .register_owner(late.public_key_bytes(), late.sign(&instance), &token)
        .await;
    assert_unauthorized(result);
}

#[tokio::test]
async fn test_exposed_record_survives_restart_intact() {
    let dir = tempfile::tempdir().unwrap();

    let operator = KeyPair::generate();
    let owner = KeyPair::generate();
    let before;

    {
        let service = file_service(dir.path());
        let instance = service.instance_pubkey();

        let token = service
            .register_operator(operator.public_key_bytes(), operator.sign(&instance))
            .await
            .unwrap();
        service
            .register_owner(owner.public_key_bytes(), owner.sign(&instance), &token)
            .await
            .unwrap();

        let config = nginx_config(instance);
        service
            .configure_workload(config.clone(), sign_canonical(&owner, &config))
            .await
            .unwrap();

        let payload = ExposePayload {
            instance_pubkey: instance,
            image: config.image.clone(),
        };
        service
            .expose_workload(payload.clone(), sign_canonical(&owner, &payload))
            .await
            .unwrap();

        before = service.record().await.unwrap();
    }

    // Restart reproduces the record byte-for-byte
    let service = file_service(dir.path());
    let after = service.record().await.unwrap();
    assert_eq!(after, before);

    assert_eq!(after.state, LifecycleState::WorkloadExposed);
    assert!(after.exposed);
    assert_eq!(
        after.operator.as_ref().unwrap().pubkey,
        operator.public_key_bytes()
    );
    assert_eq!(after.owner.as_ref().unwrap().pubkey, owner.public_key_bytes());
    assert_eq!(
        after.workload.as_ref().unwrap(),
        &nginx_config(service.instance_pubkey())
    );

    // The record stays frozen after restart
    let config = nginx_config(service.instance_pubkey());
    let result = service
        .configure_workload(config.clone(), sign_canonical(&owner, &config))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Transition(TransitionError::Conflict(_)))
    ));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operator_registration_single_winner() {
    let service = Arc::new(memory_service());
    let instance = service.instance_pubkey();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let key = KeyPair::generate();
        tasks.push(tokio::spawn(async move {
            let result = service
                .register_operator(key.public_key_bytes(), key.sign(&instance))
                .await;
            (key.public_key_bytes(), result)
        }));
    }

    let results = futures::future::join_all(tasks).await;

    let mut winners = Vec::new();
    for joined in results {
        let (pubkey, result) = joined.unwrap();
        match result {
            Ok(_) => winners.push(pubkey),
            Err(ServiceError::Transition(TransitionError::Conflict(_))) => {}
            Err(other) => panic!("unexpected failure: {:?}", other),
        }
    }

    // Exactly one registration succeeded, and it is the one recorded
    assert_eq!(winners.len(), 1);
    let record = service.record().await.unwrap();
    assert_eq!(record.operator.unwrap().pubkey, winners[0]);
    assert_eq!(record.version, 1);
}
