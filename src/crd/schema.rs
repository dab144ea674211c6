//! Schema requests: provisioning a logical database inside a managed
//! instance, with credentials issued through a vault secret engine.
//!
//! - `MySQLDatabase`
//! - `PostgresDatabase`
//! - `MongoDBDatabase`

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::common::{AppReference, Condition, LocalObjectRef};
use super::engine::DatabaseEngine;
use crate::error::Error;

/// API group of schema requests.
pub const SCHEMA_GROUP: &str = "schema.kubedb.com";
/// API version of schema requests.
pub const SCHEMA_VERSION: &str = "v1alpha1";

/// The schema request kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SchemaKind {
    MySQL,
    Postgres,
    MongoDB,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 3] = [SchemaKind::MySQL, SchemaKind::Postgres, SchemaKind::MongoDB];

    /// Resource kind (e.g. `MySQLDatabase`).
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaKind::MySQL => "MySQLDatabase",
            SchemaKind::Postgres => "PostgresDatabase",
            SchemaKind::MongoDB => "MongoDBDatabase",
        }
    }

    /// Engine of the database the schema lives in.
    pub fn engine(&self) -> DatabaseEngine {
        match self {
            SchemaKind::MySQL => DatabaseEngine::MySQL,
            SchemaKind::Postgres => DatabaseEngine::Postgres,
            SchemaKind::MongoDB => DatabaseEngine::MongoDB,
        }
    }

    /// Condition type the reconciler sets while the database server is not ready.
    pub fn not_ready_condition(&self) -> String {
        format!("{}NotReady", self.engine().kind())
    }

    /// Database names the engine keeps for itself.
    pub fn reserved_names(&self) -> &'static [&'static str] {
        match self {
            SchemaKind::MySQL => &["mysql", "sys", "information_schema", "performance_schema"],
            SchemaKind::Postgres => &["postgres", "template0", "template1"],
            SchemaKind::MongoDB => &["admin", "config", "local"],
        }
    }

    /// Whether the engine has a read-only database mode.
    pub fn supports_read_only(&self) -> bool {
        matches!(self, SchemaKind::MySQL)
    }
}

impl FromStr for SchemaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaKind::ALL
            .into_iter()
            .find(|k| k.kind() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// A schema request of any kind, as decoded from an admission review.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSchema {
    #[serde(default)]
    pub metadata: ObjectMeta,

    pub spec: SchemaSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SchemaStatus>,
}

impl DatabaseSchema {
    /// Conditions recorded by the reconciler (empty when there is no status).
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn has_finalizers(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| !f.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    /// The managed database the schema is created in.
    #[serde(default)]
    pub database_ref: AppReference,

    /// The vault server that issues credentials.
    #[serde(default)]
    pub vault_ref: AppReference,

    #[serde(default)]
    pub database_config: DatabaseConfig,

    #[serde(default)]
    pub access_policy: AccessPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitSpec>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// Engine-specific database settings. Fields not used by an engine stay unset.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,

    /// MySQL read-only flag: 1 pins the schema read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ConfigParam>,
}

impl DatabaseConfig {
    pub fn is_read_only(&self) -> bool {
        self.read_only == Some(1)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParam {
    pub config_parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Who may request credentials and for how long.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    #[serde(default)]
    pub subjects: Vec<Subject>,

    #[serde(rename = "defaultTTL", default, skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<String>,

    #[serde(rename = "maxTTL", default, skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<String>,
}

/// RBAC subject.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
}

/// One-time initialization of a new schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitSpec {
    /// Advanced by the reconciler once initialization finished.
    #[serde(default)]
    pub initialized: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSource>,
}

impl InitSpec {
    /// Same init source, ignoring the reconciler-owned `initialized` flag.
    pub fn same_source(&self, other: &InitSpec) -> bool {
        self.script == other.script && self.snapshot == other.snapshot
    }
}

/// SQL/JS script run against the new schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<LocalObjectRef>,
}

/// Restore from a backup repository.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSource {
    #[serde(default)]
    pub repository: AppReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DeletionPolicy {
    /// Drop the schema when the request is deleted.
    #[default]
    Delete,
    /// Refuse to delete the request.
    DoNotDelete,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<SchemaPhase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Lifecycle phase derived from the conditions of a schema request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SchemaPhase {
    Terminating,
    Expired,
    Success,
    Failed,
    Waiting,
    Running,
}

impl SchemaPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SchemaPhase::Success | SchemaPhase::Failed)
    }
}

impl fmt::Display for SchemaPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaPhase::Terminating => write!(f, "Terminating"),
            SchemaPhase::Expired => write!(f, "Expired"),
            SchemaPhase::Success => write!(f, "Success"),
            SchemaPhase::Failed => write!(f, "Failed"),
            SchemaPhase::Waiting => write!(f, "Waiting"),
            SchemaPhase::Running => write!(f, "Running"),
        }
    }
}

/// Condition types recorded on schema requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaConditionType {
    DatabaseReady,
    VaultReady,
    VaultNotReady,
    SecretAccessRequestCreated,
    SecretAccessRequestApproved,
    SecretAccessRequestDenied,
    SecretAccessRequestExpired,
    DatabaseCreated,
    ScriptApplied,
    FailedInitializing,
    RestoredFromRepository,
    FailedRestoring,
    SchemaIgnored,
}

impl SchemaConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaConditionType::DatabaseReady => "DatabaseReady",
            SchemaConditionType::VaultReady => "VaultReady",
            SchemaConditionType::VaultNotReady => "VaultNotReady",
            SchemaConditionType::SecretAccessRequestCreated => "SecretAccessRequestCreated",
            SchemaConditionType::SecretAccessRequestApproved => "SecretAccessRequestApproved",
            SchemaConditionType::SecretAccessRequestDenied => "SecretAccessRequestDenied",
            SchemaConditionType::SecretAccessRequestExpired => "SecretAccessRequestExpired",
            SchemaConditionType::DatabaseCreated => "DatabaseCreated",
            SchemaConditionType::ScriptApplied => "ScriptApplied",
            SchemaConditionType::FailedInitializing => "FailedInitializing",
            SchemaConditionType::RestoredFromRepository => "RestoredFromRepository",
            SchemaConditionType::FailedRestoring => "FailedRestoring",
            SchemaConditionType::SchemaIgnored => "SchemaIgnored",
        }
    }
}

impl fmt::Display for SchemaConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
