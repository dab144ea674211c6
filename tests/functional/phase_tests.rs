//! Lifecycle phase of schema requests.

use dbops_webhook::compute_phase;
use dbops_webhook::crd::{InitSpec, SchemaKind, SchemaPhase, ScriptSource};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::fixtures::SchemaBuilder;

fn with_init() -> InitSpec {
    InitSpec {
        script: Some(ScriptSource {
            script_path: Some("/init".to_string()),
            config_map: None,
        }),
        ..Default::default()
    }
}

#[test]
fn test_created_without_init_is_success() {
    let schema = SchemaBuilder::new("app", "server")
        .condition("DatabaseCreated")
        .build();
    for kind in SchemaKind::ALL {
        assert_eq!(compute_phase(kind, &schema), SchemaPhase::Success);
    }
}

#[test]
fn test_failed_initializing() {
    let schema = SchemaBuilder::new("app", "server")
        .init(with_init())
        .condition("DatabaseCreated")
        .condition("FailedInitializing")
        .build();
    assert_eq!(compute_phase(SchemaKind::MySQL, &schema), SchemaPhase::Failed);
}

#[test]
fn test_deletion_is_terminating() {
    let mut schema = SchemaBuilder::new("app", "server")
        .condition("DatabaseCreated")
        .condition("SecretAccessRequestExpired")
        .build();
    schema.metadata.deletion_timestamp = Some(Time(k8s_openapi::chrono::Utc::now()));
    assert_eq!(
        compute_phase(SchemaKind::Postgres, &schema),
        SchemaPhase::Terminating
    );
}

#[test]
fn test_vault_not_ready_waits() {
    let schema = SchemaBuilder::new("app", "server")
        .condition("VaultNotReady")
        .condition("DatabaseCreated")
        .build();
    assert_eq!(compute_phase(SchemaKind::MongoDB, &schema), SchemaPhase::Waiting);
}

#[test]
fn test_engine_not_ready_waits() {
    let schema = SchemaBuilder::new("app", "server")
        .condition("MongoDBNotReady")
        .build();
    assert_eq!(compute_phase(SchemaKind::MongoDB, &schema), SchemaPhase::Waiting);
}

#[test]
fn test_phase_is_deterministic() {
    let schema = SchemaBuilder::new("app", "server")
        .init(with_init())
        .condition("SecretAccessRequestCreated")
        .condition("SecretAccessRequestApproved")
        .condition("DatabaseCreated")
        .build();
    let first = compute_phase(SchemaKind::MySQL, &schema);
    assert_eq!(first, SchemaPhase::Running);
    for _ in 0..10 {
        assert_eq!(compute_phase(SchemaKind::MySQL, &schema.clone()), first);
    }
}
