//! Test fixtures and builder patterns for ops requests, databases, catalog
//! entries and schema requests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use dbops_webhook::crd::{
    AppReference, CatalogVersion, Condition, DatabaseEngine, DatabaseSchema, DeletionPolicy,
    InitSpec, ManagedDatabase, OpsRequest, ResourceKind, SchemaKind, SchemaSpec, SchemaStatus, Subject,
};
use dbops_webhook::validation::InMemoryStore;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Map, Value, json};

pub const NAMESPACE: &str = "demo";

/// Builder for `<Engine>` database fixtures.
///
/// # Example
/// ```ignore
/// let db = DatabaseBuilder::new("my-group")
///     .version("8.0.35")
///     .topology_mode("GroupReplication")
///     .storage("10Gi")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct DatabaseBuilder {
    name: String,
    spec: Map<String, Value>,
    topology: Map<String, Value>,
}

impl DatabaseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut spec = Map::new();
        spec.insert("version".to_string(), json!("8.0.35"));
        Self {
            name: name.into(),
            spec,
            topology: Map::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.spec.insert("version".to_string(), json!(version));
        self
    }

    pub fn replicas(mut self, replicas: i32) -> Self {
        self.spec.insert("replicas".to_string(), json!(replicas));
        self
    }

    /// Engine-level mode (`spec.mode`).
    pub fn mode(mut self, mode: &str) -> Self {
        self.spec.insert("mode".to_string(), json!(mode));
        self
    }

    /// Clustering mode under `spec.topology`.
    pub fn topology_mode(mut self, mode: &str) -> Self {
        self.topology.insert("mode".to_string(), json!(mode));
        self
    }

    /// Add a dedicated topology role with its own storage request.
    pub fn role(mut self, role: &str, replicas: i32, storage: &str) -> Self {
        self.topology.insert(
            role.to_string(),
            json!({
                "replicas": replicas,
                "storage": {"resources": {"requests": {"storage": storage}}}
            }),
        );
        self
    }

    pub fn storage(mut self, size: &str) -> Self {
        self.spec.insert(
            "storage".to_string(),
            json!({"resources": {"requests": {"storage": size}}}),
        );
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.spec.insert("storageType".to_string(), json!("Ephemeral"));
        self
    }

    pub fn config_secret(mut self, name: &str) -> Self {
        self.spec.insert("configSecret".to_string(), json!({"name": name}));
        self
    }

    pub fn tls(mut self, issuer: &str) -> Self {
        self.spec
            .insert("tls".to_string(), json!({"issuerRef": {"name": issuer}}));
        self
    }

    pub fn build(mut self) -> ManagedDatabase {
        if !self.topology.is_empty() {
            self.spec
                .insert("topology".to_string(), Value::Object(self.topology));
        }
        serde_json::from_value(json!({
            "metadata": {"name": self.name, "namespace": NAMESPACE},
            "spec": self.spec,
        }))
        .expect("database fixture must decode")
    }
}

/// Builder for ops request fixtures. Sub-specs are given as raw JSON so
/// tests can express malformed shapes too.
#[derive(Clone, Debug)]
pub struct OpsRequestBuilder {
    name: String,
    spec: Map<String, Value>,
    phase: Option<String>,
}

impl OpsRequestBuilder {
    pub fn new(name: impl Into<String>, database: &str) -> Self {
        let mut spec = Map::new();
        spec.insert("databaseRef".to_string(), json!({"name": database}));
        Self {
            name: name.into(),
            spec,
            phase: None,
        }
    }

    pub fn op_type(mut self, op: &str) -> Self {
        self.spec.insert("type".to_string(), json!(op));
        self
    }

    /// Set a sub-spec by its JSON field name (`horizontalScaling`, `tls`, ...).
    pub fn sub_spec(mut self, field: &str, value: Value) -> Self {
        self.spec.insert(field.to_string(), value);
        self
    }

    pub fn without(mut self, field: &str) -> Self {
        self.spec.remove(field);
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.spec.insert("timeout".to_string(), json!(timeout));
        self
    }

    pub fn apply(mut self, policy: &str) -> Self {
        self.spec.insert("apply".to_string(), json!(policy));
        self
    }

    /// Status phase as written by the reconciler.
    pub fn phase(mut self, phase: &str) -> Self {
        self.phase = Some(phase.to_string());
        self
    }

    pub fn build(self) -> OpsRequest {
        let mut object = json!({
            "metadata": {"name": self.name, "namespace": NAMESPACE},
            "spec": self.spec,
        });
        if let (Some(phase), Some(map)) = (self.phase, object.as_object_mut()) {
            map.insert("status".to_string(), json!({"phase": phase}));
        }
        serde_json::from_value(object).expect("ops request fixture must decode")
    }
}

/// A catalog entry for an engine version.
pub fn catalog_version(name: &str, version: &str, deprecated: bool) -> CatalogVersion {
    serde_json::from_value(json!({
        "metadata": {"name": name},
        "spec": {"version": version, "deprecated": deprecated}
    }))
    .expect("catalog fixture must decode")
}

/// A catalog entry with standalone update constraints.
pub fn constrained_version(
    name: &str,
    version: &str,
    allowlist: &[&str],
    denylist: &[&str],
) -> CatalogVersion {
    serde_json::from_value(json!({
        "metadata": {"name": name},
        "spec": {
            "version": version,
            "updateConstraints": {
                "allowlist": {"standalone": allowlist, "cluster": allowlist},
                "denylist": {"standalone": denylist, "cluster": denylist}
            }
        }
    }))
    .expect("catalog fixture must decode")
}

/// Builder for schema request fixtures.
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    name: String,
    spec: SchemaSpec,
    finalizers: Vec<String>,
    conditions: Vec<Condition>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, database: &str) -> Self {
        let name = name.into();
        let mut spec = SchemaSpec {
            database_ref: AppReference {
                name: database.to_string(),
                namespace: None,
            },
            vault_ref: AppReference {
                name: "vault".to_string(),
                namespace: Some(NAMESPACE.to_string()),
            },
            ..Default::default()
        };
        spec.database_config.name = name.replace('-', "_");
        spec.access_policy.subjects.push(Subject {
            kind: "ServiceAccount".to_string(),
            name: "app".to_string(),
            namespace: Some(NAMESPACE.to_string()),
            api_group: None,
        });
        Self {
            name,
            spec,
            finalizers: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn database_name(mut self, name: &str) -> Self {
        self.spec.database_config.name = name.to_string();
        self
    }

    pub fn vault(mut self, name: &str) -> Self {
        self.spec.vault_ref.name = name.to_string();
        self
    }

    pub fn read_only(mut self, value: i32) -> Self {
        self.spec.database_config.read_only = Some(value);
        self
    }

    pub fn init(mut self, init: InitSpec) -> Self {
        self.spec.init = Some(init);
        self
    }

    pub fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.spec.deletion_policy = policy;
        self
    }

    pub fn ttl(mut self, default_ttl: &str, max_ttl: &str) -> Self {
        self.spec.access_policy.default_ttl = Some(default_ttl.to_string());
        self.spec.access_policy.max_ttl = Some(max_ttl.to_string());
        self
    }

    /// Mark the schema as picked up by the reconciler.
    pub fn finalized(mut self) -> Self {
        self.finalizers.push("kubedb.com".to_string());
        self
    }

    pub fn condition(mut self, condition_type: &str) -> Self {
        self.conditions
            .push(Condition::new(condition_type, true, "Test", "", Some(1)));
        self
    }

    pub fn build(self) -> DatabaseSchema {
        DatabaseSchema {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(NAMESPACE.to_string()),
                finalizers: (!self.finalizers.is_empty()).then_some(self.finalizers),
                ..Default::default()
            },
            spec: self.spec,
            status: (!self.conditions.is_empty()).then(|| SchemaStatus {
                conditions: self.conditions,
                ..Default::default()
            }),
        }
    }
}

/// In-memory store seeded through typed helpers.
pub struct Seeded {
    pub store: Arc<InMemoryStore>,
}

impl Default for Seeded {
    fn default() -> Self {
        Self::new()
    }
}

impl Seeded {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
        }
    }

    pub fn database(self, engine: DatabaseEngine, db: &ManagedDatabase) -> Self {
        let name = db.metadata.name.clone().unwrap_or_default();
        self.store
            .insert(Some(NAMESPACE), &name, &engine.database_resource(), db)
            .expect("seed database");
        self
    }

    pub fn version(self, engine: DatabaseEngine, version: &CatalogVersion) -> Self {
        let name = version.metadata.name.clone().unwrap_or_default();
        self.store
            .insert(None, &name, &engine.version_resource(), version)
            .expect("seed catalog version");
        self
    }

    pub fn secret(self, name: &str) -> Self {
        let secret = json!({"metadata": {"name": name, "namespace": NAMESPACE}});
        self.store
            .insert(Some(NAMESPACE), name, &ResourceKind::secret(), &secret)
            .expect("seed secret");
        self
    }

    pub fn schema_database(self, kind: SchemaKind, name: &str) -> Self {
        self.database(kind.engine(), &DatabaseBuilder::new(name).build())
    }
}

/// Count fields set in a map-shaped sub-spec (used by property tests).
pub fn counts(field: &str, count: i32) -> Value {
    let mut map = BTreeMap::new();
    map.insert(field.to_string(), count);
    json!(map)
}
