//! Managed database instances and the version catalog.
//!
//! Both are owned by the reconcilers; this crate only reads them. The model
//! is a normalized projection of the per-engine objects: roles of a
//! dedicated topology live under `spec.topology.<role>`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PersistentVolumeClaimSpec;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::common::{Condition, LocalObjectRef, TlsConfig};

/// A managed database instance of any engine.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDatabase {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: DatabaseSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DatabaseStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Name of the catalog entry the database runs.
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Engine-level mode (Redis: Standalone, Cluster or Sentinel).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<DatabaseTopology>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<StorageType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<PersistentVolumeClaimSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_secret: Option<LocalObjectRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<LocalObjectRef>,

    #[serde(rename = "requireSSL", default, skip_serializing_if = "Option::is_none")]
    pub require_ssl: Option<bool>,
}

/// Dedicated topology: a clustering mode and per-role settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseTopology {
    /// Clustering mode (MySQL: GroupReplication, InnoDBCluster, SemiSync, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Role name to role settings (`master`, `data`, `shard`, ...).
    #[serde(flatten)]
    pub roles: BTreeMap<String, RoleSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<PersistentVolumeClaimSpec>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum StorageType {
    #[default]
    Durable,
    Ephemeral,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Storage request of a PVC template, if any.
fn requested_storage(spec: Option<&PersistentVolumeClaimSpec>) -> Option<&Quantity> {
    spec?.resources.as_ref()?.requests.as_ref()?.get("storage")
}

impl ManagedDatabase {
    /// Clustering mode declared by the dedicated topology.
    pub fn topology_mode(&self) -> Option<&str> {
        self.spec.topology.as_ref()?.mode.as_deref()
    }

    /// Whether a dedicated topology with at least one role is configured.
    pub fn has_topology_roles(&self) -> bool {
        self.spec
            .topology
            .as_ref()
            .is_some_and(|t| !t.roles.is_empty())
    }

    pub fn replicas(&self) -> i32 {
        self.spec.replicas.unwrap_or(1)
    }

    pub fn has_custom_config(&self) -> bool {
        self.spec
            .config_secret
            .as_ref()
            .is_some_and(|s| !s.name.is_empty())
    }

    pub fn has_tls(&self) -> bool {
        self.spec.tls.is_some()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.spec.storage_type == Some(StorageType::Ephemeral)
    }

    /// Current storage request for a role, falling back to the top-level
    /// storage when the role has none of its own.
    pub fn storage_request(&self, role: &str) -> Option<&Quantity> {
        let role_storage = self
            .spec
            .topology
            .as_ref()
            .and_then(|t| t.roles.get(role))
            .and_then(|r| requested_storage(r.storage.as_ref()));
        role_storage.or_else(|| requested_storage(self.spec.storage.as_ref()))
    }
}

/// A version catalog entry (`<Engine>Version`, cluster scoped).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVersion {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: CatalogVersionSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVersionSpec {
    /// Software version shipped by this entry (e.g. "8.0.35").
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_constraints: Option<UpdateConstraints>,
}

/// Allowed and denied transitions out of a catalog entry.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowlist: Option<TopologyConstraints>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denylist: Option<TopologyConstraints>,
}

/// Version ranges, split by database topology.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopologyConstraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standalone: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster: Vec<String>,
}

impl TopologyConstraints {
    pub fn for_topology(&self, clustered: bool) -> &[String] {
        if clustered {
            &self.cluster
        } else {
            &self.standalone
        }
    }
}
