//! Every engine × operation kind, built from the engine's rule table.
//!
//! A case with the required sub-spec and a valid database reference must be
//! admitted; the same case without the sub-spec must be rejected with a
//! Structural error on the sub-spec path.

use dbops_webhook::crd::{DatabaseEngine, OpsRequestType};
use dbops_webhook::validation::profiles::Clustering;
use dbops_webhook::validation::{
    EngineProfile, ErrorCategory, ErrorType, OpsRequestValidator, profile,
};
use serde_json::{Value, json};
use tracing::Span;

use crate::fixtures::{DatabaseBuilder, OpsRequestBuilder, Seeded, catalog_version, counts};
use crate::{error_at, rejection};

const DB: &str = "db";

struct Case {
    seeded: Seeded,
    request: OpsRequestBuilder,
}

fn version_for(engine: DatabaseEngine) -> &'static str {
    match engine {
        DatabaseEngine::Redis | DatabaseEngine::RedisSentinel => "6.2.14",
        DatabaseEngine::Postgres => "16.1",
        _ => "8.0.35",
    }
}

fn clustered(profile: &EngineProfile, db: DatabaseBuilder) -> DatabaseBuilder {
    match profile.clustering {
        Clustering::Never => db,
        Clustering::TopologyRoles => db.role("data", 3, "1Gi"),
        Clustering::TopologyModeIn(modes) => db.topology_mode(modes[0]),
        Clustering::ModeIn(modes) => db.mode(modes[0]),
        Clustering::ReplicasAbove(n) => db.replicas(n + 2),
    }
}

/// A request for `op` that the engine's rules accept.
fn valid_case(engine: DatabaseEngine, op: OpsRequestType) -> Case {
    let profile = profile(engine);
    let version = version_for(engine);
    let mut db = DatabaseBuilder::new(DB).version(version).storage("1Gi");
    let mut seeded = Seeded::new();

    let sub_spec: Value = match op {
        OpsRequestType::UpdateVersion => {
            let target = format!("{}-patch", version);
            seeded = seeded
                .version(engine, &catalog_version(version, version, false))
                .version(engine, &catalog_version(&target, version, false));
            json!({"targetVersion": target})
        }
        OpsRequestType::HorizontalScaling => {
            let rules = &profile.horizontal;
            let (field, needs_cluster) = if let Some(field) = rules.shape.shared.first() {
                (
                    *field,
                    rules.requires_clustered || !rules.resizable_modes.is_empty(),
                )
            } else if let Some(field) = rules.shape.standalone.first() {
                (*field, false)
            } else {
                (rules.shape.clustered[0], true)
            };
            if needs_cluster {
                db = clustered(profile, db);
            }
            let count = rules.quorum.map_or(3, |q| q.min.max(3));
            counts(field, count)
        }
        OpsRequestType::VerticalScaling => {
            let shape = &profile.vertical;
            let field = shape
                .shared
                .first()
                .or(shape.standalone.first())
                .copied()
                .unwrap();
            json!({field: {"resources": {
                "requests": {"cpu": "500m", "memory": "1Gi"},
                "limits": {"cpu": "1", "memory": "2Gi"}
            }}})
        }
        OpsRequestType::VolumeExpansion => {
            let shape = profile.volume.unwrap();
            let field = shape
                .shared
                .first()
                .or(shape.standalone.first())
                .copied()
                .unwrap();
            json!({"mode": "Online", field: "2Gi"})
        }
        OpsRequestType::Restart => json!({}),
        OpsRequestType::Reconfigure => {
            json!({"applyConfig": {"custom.conf": "max_connections = 200"}})
        }
        OpsRequestType::ReconfigureTLS => json!({"issuerRef": {"name": "ca-issuer"}}),
        OpsRequestType::RotateAuth => json!({}),
    };

    Case {
        seeded: seeded.database(engine, &db.build()),
        request: OpsRequestBuilder::new(format!("{}-{}", engine, op).to_lowercase(), DB)
            .op_type(op.as_str())
            .sub_spec(op.field_name(), sub_spec),
    }
}

fn validator(seeded: &Seeded) -> OpsRequestValidator<dbops_webhook::InMemoryStore> {
    OpsRequestValidator::new(seeded.store.clone(), Span::none())
}

#[tokio::test]
async fn test_engine_matrix_valid_requests_admitted() {
    for engine in DatabaseEngine::ALL {
        for &op in profile(engine).operations {
            let case = valid_case(engine, op);
            let result = validator(&case.seeded)
                .validate_create(engine, &case.request.build())
                .await;
            assert!(
                result.is_ok(),
                "{} {} should be admitted: {:?}",
                engine,
                op,
                result
            );
        }
    }
}

#[tokio::test]
async fn test_engine_matrix_missing_sub_spec_rejected() {
    for engine in DatabaseEngine::ALL {
        for &op in profile(engine).operations {
            if op == OpsRequestType::Restart {
                continue;
            }
            let case = valid_case(engine, op);
            let request = case.request.without(op.field_name()).build();
            let invalid = rejection(validator(&case.seeded).validate_create(engine, &request).await);

            let path = format!("spec.{}", op.field_name());
            let err = error_at(&invalid, &path)
                .unwrap_or_else(|| panic!("{} {}: no error at {}: {}", engine, op, path, invalid));
            assert_eq!(err.error_type, ErrorType::Required);
            assert_eq!(err.category, ErrorCategory::Structural);
            assert_eq!(invalid.kind, engine.ops_kind());
        }
    }
}

#[tokio::test]
async fn test_restart_without_sub_spec_admitted() {
    for engine in DatabaseEngine::ALL {
        let case = valid_case(engine, OpsRequestType::Restart);
        let request = case.request.without("restart").build();
        assert!(
            validator(&case.seeded)
                .validate_create(engine, &request)
                .await
                .is_ok(),
            "{} Restart without sub-spec",
            engine
        );
    }
}

#[tokio::test]
async fn test_unsupported_types_rejected() {
    for engine in DatabaseEngine::ALL {
        let profile = profile(engine);
        for op in OpsRequestType::ALL.into_iter().filter(|op| !profile.supports(*op)) {
            let seeded = Seeded::new().database(engine, &DatabaseBuilder::new(DB).build());
            let request = OpsRequestBuilder::new("unsupported", DB)
                .op_type(op.as_str())
                .sub_spec(op.field_name(), json!({}))
                .build();
            let invalid = rejection(validator(&seeded).validate_create(engine, &request).await);

            let err = error_at(&invalid, "spec.type").unwrap();
            assert_eq!(err.error_type, ErrorType::NotSupported);
            assert_eq!(err.category, ErrorCategory::UnsupportedType);
        }
    }
}

#[tokio::test]
async fn test_missing_database_is_referential() {
    for engine in DatabaseEngine::ALL {
        let request = OpsRequestBuilder::new("restart", "absent")
            .op_type("Restart")
            .build();
        let invalid = rejection(
            validator(&Seeded::new())
                .validate_create(engine, &request)
                .await,
        );
        let err = error_at(&invalid, "spec.databaseRef").unwrap();
        assert_eq!(err.category, ErrorCategory::Referential);
    }
}
