//! Per-rule scenarios for ops requests.

use dbops_webhook::InMemoryStore;
use dbops_webhook::crd::DatabaseEngine;
use dbops_webhook::validation::{ErrorCategory, ErrorType, OpsRequestValidator};
use serde_json::json;
use tracing::Span;

use crate::fixtures::{
    DatabaseBuilder, OpsRequestBuilder, Seeded, catalog_version, constrained_version,
};
use crate::{error_at, rejection};

fn validator(seeded: &Seeded) -> OpsRequestValidator<InMemoryStore> {
    OpsRequestValidator::new(seeded.store.clone(), Span::none())
}

fn mysql_group(name: &str) -> Seeded {
    let db = DatabaseBuilder::new(name)
        .version("8.0.35")
        .topology_mode("GroupReplication")
        .storage("10Gi")
        .build();
    Seeded::new().database(DatabaseEngine::MySQL, &db)
}

// ============================================================================
// HorizontalScaling
// ============================================================================

#[tokio::test]
async fn test_mysql_group_size_below_quorum() {
    let seeded = mysql_group("my-group");
    let request = OpsRequestBuilder::new("scale", "my-group")
        .op_type("HorizontalScaling")
        .sub_spec("horizontalScaling", json!({"member": 2}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.horizontalScaling.member").unwrap();
    assert!(
        err.detail
            .contains("Group size can not be less than 3 or greater than 9"),
        "{}",
        err
    );
}

#[tokio::test]
async fn test_mysql_group_size_within_quorum() {
    let seeded = mysql_group("my-group");
    for member in [3, 5, 9] {
        let request = OpsRequestBuilder::new("scale", "my-group")
            .op_type("HorizontalScaling")
            .sub_spec("horizontalScaling", json!({"member": member}))
            .build();
        assert!(
            validator(&seeded)
                .validate_create(DatabaseEngine::MySQL, &request)
                .await
                .is_ok()
        );
    }
}

#[tokio::test]
async fn test_mysql_scaling_needs_group_replication() {
    let db = DatabaseBuilder::new("semi").topology_mode("SemiSync").build();
    let seeded = Seeded::new().database(DatabaseEngine::MySQL, &db);
    let request = OpsRequestBuilder::new("scale", "semi")
        .op_type("HorizontalScaling")
        .sub_spec("horizontalScaling", json!({"member": 5}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    assert_eq!(
        error_at(&invalid, "spec.horizontalScaling")
            .unwrap()
            .error_type,
        ErrorType::Forbidden
    );
}

#[tokio::test]
async fn test_mongodb_shape_mismatch() {
    let db = DatabaseBuilder::new("mg").build();
    let seeded = Seeded::new().database(DatabaseEngine::MongoDB, &db);
    let request = OpsRequestBuilder::new("scale", "mg")
        .op_type("HorizontalScaling")
        .sub_spec("horizontalScaling", json!({"shards": 3}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MongoDB, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.horizontalScaling.shards").unwrap();
    assert_eq!(err.error_type, ErrorType::Forbidden);
    assert_eq!(err.category, ErrorCategory::Structural);
}

// ============================================================================
// Reconfigure
// ============================================================================

#[tokio::test]
async fn test_reconfigure_more_than_one_operation() {
    let seeded = mysql_group("my").secret("my-config");
    let request = OpsRequestBuilder::new("reconfigure", "my")
        .op_type("Reconfigure")
        .sub_spec(
            "configuration",
            json!({
                "configSecret": {"name": "my-config"},
                "applyConfig": {"my.cnf": "[mysqld]\nmax_connections = 300"},
                "removeCustomConfig": true
            }),
        )
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    assert_eq!(invalid.errors.len(), 1);
    let err = invalid.errors.iter().next().unwrap();
    assert_eq!(err.field, "spec.configuration");
    assert!(err.detail.contains("more than one operation"));
}

#[tokio::test]
async fn test_reconfigure_config_secret_must_exist() {
    let seeded = mysql_group("my");
    let request = OpsRequestBuilder::new("reconfigure", "my")
        .op_type("Reconfigure")
        .sub_spec("configuration", json!({"configSecret": {"name": "absent"}}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.configuration.configSecret.name").unwrap();
    assert_eq!(err.category, ErrorCategory::Referential);

    let seeded = seeded.secret("absent");
    assert!(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await
            .is_ok()
    );
}

// ============================================================================
// VolumeExpansion
// ============================================================================

#[tokio::test]
async fn test_volume_expansion_is_monotonic() {
    let db = DatabaseBuilder::new("pg").storage("10Gi").build();
    let seeded = Seeded::new().database(DatabaseEngine::Postgres, &db);

    for (size, admitted) in [("5Gi", false), ("10Gi", false), ("10737418240", false), ("11Gi", true), ("1Ti", true)] {
        let request = OpsRequestBuilder::new("expand", "pg")
            .op_type("VolumeExpansion")
            .sub_spec("volumeExpansion", json!({"mode": "Offline", "postgres": size}))
            .build();
        let result = validator(&seeded)
            .validate_create(DatabaseEngine::Postgres, &request)
            .await;
        assert_eq!(result.is_ok(), admitted, "size {}: {:?}", size, result);
    }
}

#[tokio::test]
async fn test_volume_expansion_ephemeral_forbidden() {
    let db = DatabaseBuilder::new("pg").storage("10Gi").ephemeral().build();
    let seeded = Seeded::new().database(DatabaseEngine::Postgres, &db);
    let request = OpsRequestBuilder::new("expand", "pg")
        .op_type("VolumeExpansion")
        .sub_spec("volumeExpansion", json!({"postgres": "20Gi"}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::Postgres, &request)
            .await,
    );
    assert_eq!(
        error_at(&invalid, "spec.volumeExpansion").unwrap().error_type,
        ErrorType::Forbidden
    );
}

// ============================================================================
// UpdateVersion
// ============================================================================

#[tokio::test]
async fn test_update_to_deprecated_version() {
    let seeded = mysql_group("my")
        .version(DatabaseEngine::MySQL, &catalog_version("8.0.35", "8.0.35", false))
        .version(DatabaseEngine::MySQL, &catalog_version("5.7.25", "5.7.25", true));
    let request = OpsRequestBuilder::new("update", "my")
        .op_type("UpdateVersion")
        .sub_spec("updateVersion", json!({"targetVersion": "5.7.25"}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.updateVersion.targetVersion").unwrap();
    assert!(err.detail.contains("5.7.25 is deprecated"), "{}", err);
}

#[tokio::test]
async fn test_update_to_unknown_version() {
    let seeded = mysql_group("my");
    let request = OpsRequestBuilder::new("update", "my")
        .op_type("UpdateVersion")
        .sub_spec("updateVersion", json!({"targetVersion": "9.9.9"}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.updateVersion.targetVersion").unwrap();
    assert_eq!(err.error_type, ErrorType::NotFound);
}

#[tokio::test]
async fn test_update_from_uncataloged_version() {
    let seeded =
        mysql_group("my").version(DatabaseEngine::MySQL, &catalog_version("8.4.0", "8.4.0", false));
    let request = OpsRequestBuilder::new("update", "my")
        .op_type("UpdateVersion")
        .sub_spec("updateVersion", json!({"targetVersion": "8.4.0"}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    let err = error_at(&invalid, "spec.databaseRef").unwrap();
    assert_eq!(err.error_type, ErrorType::NotFound);
    assert_eq!(err.category, ErrorCategory::Referential);
    assert!(err.detail.contains("MySQLVersion \"8.0.35\" does not exist"), "{}", err);
}

#[tokio::test]
async fn test_update_denylist() {
    let db = DatabaseBuilder::new("pg").version("13.13").build();
    let seeded = Seeded::new()
        .database(DatabaseEngine::Postgres, &db)
        .version(
            DatabaseEngine::Postgres,
            &constrained_version("13.13", "13.13", &[], &["< 14.0.0"]),
        )
        .version(DatabaseEngine::Postgres, &catalog_version("13.14", "13.14", false))
        .version(DatabaseEngine::Postgres, &catalog_version("16.1", "16.1", false));

    let update = |target: &str| {
        OpsRequestBuilder::new("update", "pg")
            .op_type("UpdateVersion")
            .sub_spec("updateVersion", json!({"targetVersion": target}))
            .build()
    };

    assert!(
        validator(&seeded)
            .validate_create(DatabaseEngine::Postgres, &update("13.14"))
            .await
            .is_err()
    );
    assert!(
        validator(&seeded)
            .validate_create(DatabaseEngine::Postgres, &update("16.1"))
            .await
            .is_ok()
    );
}

// ============================================================================
// ReconfigureTLS / RotateAuth
// ============================================================================

#[tokio::test]
async fn test_rotate_certificates_needs_tls() {
    let seeded = mysql_group("my");
    let request = OpsRequestBuilder::new("tls", "my")
        .op_type("ReconfigureTLS")
        .sub_spec("tls", json!({"rotateCertificates": true}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    assert!(error_at(&invalid, "spec.tls.rotateCertificates").is_some());

    let db = DatabaseBuilder::new("secure").tls("ca-issuer").build();
    let seeded = seeded.database(DatabaseEngine::MySQL, &db);
    let request = OpsRequestBuilder::new("tls", "secure")
        .op_type("ReconfigureTLS")
        .sub_spec("tls", json!({"rotateCertificates": true}))
        .build();
    assert!(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_redis7_rotate_auth_needs_tls() {
    let db = DatabaseBuilder::new("rd").version("7.2.4").build();
    let seeded = Seeded::new().database(DatabaseEngine::Redis, &db);
    let request = OpsRequestBuilder::new("rotate", "rd")
        .op_type("RotateAuth")
        .sub_spec("authentication", json!({}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::Redis, &request)
            .await,
    );
    assert_eq!(
        error_at(&invalid, "spec.authentication").unwrap().error_type,
        ErrorType::Forbidden
    );
}

// ============================================================================
// Common checks, update and delete
// ============================================================================

#[tokio::test]
async fn test_timeout_and_apply_warning() {
    let seeded = mysql_group("my");
    let request = OpsRequestBuilder::new("restart", "my")
        .op_type("Restart")
        .timeout("1h30m")
        .apply("Always")
        .build();
    let warnings = validator(&seeded)
        .validate_create(DatabaseEngine::MySQL, &request)
        .await
        .unwrap();
    assert_eq!(warnings.len(), 1);

    let request = OpsRequestBuilder::new("restart", "my")
        .op_type("Restart")
        .timeout("soon")
        .build();
    let invalid = rejection(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await,
    );
    assert!(error_at(&invalid, "spec.timeout").is_some());
}

#[tokio::test]
async fn test_legacy_upgrade_type_accepted() {
    let seeded = mysql_group("my")
        .version(DatabaseEngine::MySQL, &catalog_version("8.0.35", "8.0.35", false))
        .version(DatabaseEngine::MySQL, &catalog_version("8.0.36", "8.0.36", false));
    let request = OpsRequestBuilder::new("upgrade", "my")
        .op_type("Upgrade")
        .sub_spec("updateVersion", json!({"targetVersion": "8.0.36"}))
        .build();
    assert!(
        validator(&seeded)
            .validate_create(DatabaseEngine::MySQL, &request)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_rejects_spec_change() {
    let seeded = mysql_group("my-group");
    let old = OpsRequestBuilder::new("scale", "my-group")
        .op_type("HorizontalScaling")
        .sub_spec("horizontalScaling", json!({"member": 3}))
        .build();
    let new = OpsRequestBuilder::new("scale", "my-group")
        .op_type("HorizontalScaling")
        .sub_spec("horizontalScaling", json!({"member": 5}))
        .build();

    let invalid = rejection(
        validator(&seeded)
            .validate_update(DatabaseEngine::MySQL, &old, &new)
            .await,
    );
    assert!(
        invalid
            .errors
            .iter()
            .all(|e| e.category == ErrorCategory::Immutability)
    );
    assert!(error_at(&invalid, "spec.horizontalScaling.member").is_some());

    assert!(
        validator(&seeded)
            .validate_update(DatabaseEngine::MySQL, &old, &old.clone())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_rejects_unmodeled_spec_change() {
    let seeded = mysql_group("my");
    let restart = |retries: i64, diff: &str| {
        OpsRequestBuilder::new("restart", "my")
            .op_type("Restart")
            .sub_spec("maxRetries", json!(retries))
            .sub_spec("readinessCriteria", json!({"objectsCountDiffPercentage": diff}))
            .build()
    };

    let invalid = rejection(
        validator(&seeded)
            .validate_update(DatabaseEngine::MySQL, &restart(1, "10"), &restart(5, "90"))
            .await,
    );
    assert_eq!(invalid.errors.len(), 2);
    assert!(error_at(&invalid, "spec.maxRetries").is_some());
    assert!(error_at(&invalid, "spec.readinessCriteria.objectsCountDiffPercentage").is_some());
}

#[tokio::test]
async fn test_metadata_update_after_completion() {
    let db = DatabaseBuilder::new("pg").storage("20Gi").build();
    let seeded = Seeded::new().database(DatabaseEngine::Postgres, &db);
    let expand = OpsRequestBuilder::new("expand", "pg")
        .op_type("VolumeExpansion")
        .sub_spec("volumeExpansion", json!({"postgres": "20Gi"}));

    let old = expand.clone().phase("Successful").build();
    let mut new = old.clone();
    new.metadata.finalizers = Some(Vec::new());
    new.metadata.labels = Some([("audit".to_string(), "done".to_string())].into());
    assert!(
        validator(&seeded)
            .validate_update(DatabaseEngine::Postgres, &old, &new)
            .await
            .is_ok()
    );

    let pending = expand.build();
    assert!(
        validator(&seeded)
            .validate_update(DatabaseEngine::Postgres, &pending, &pending.clone())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_delete_always_allowed() {
    let request = OpsRequestBuilder::new("restart", "gone").build();
    assert!(
        validator(&Seeded::new())
            .validate_delete(DatabaseEngine::Kafka, &request)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_store_outage_is_retryable() {
    let seeded = mysql_group("my");
    seeded.store.set_unavailable(true);
    let request = OpsRequestBuilder::new("restart", "my")
        .op_type("Restart")
        .build();
    let err = validator(&seeded)
        .validate_create(DatabaseEngine::MySQL, &request)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
