//! Database engines and the API coordinates of their resources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// API group of managed database objects.
pub const DATABASE_GROUP: &str = "kubedb.com";
/// API version of managed database objects.
pub const DATABASE_VERSION: &str = "v1";
/// API group of operation requests.
pub const OPS_GROUP: &str = "ops.kubedb.com";
/// API version of operation requests.
pub const OPS_VERSION: &str = "v1alpha1";
/// API group of version catalog entries.
pub const CATALOG_GROUP: &str = "catalog.kubedb.com";
/// API version of version catalog entries.
pub const CATALOG_VERSION: &str = "v1alpha1";

/// Group/version/kind/plural of a resource, plus whether it is namespaced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl ResourceKind {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced,
        }
    }

    /// Core v1 Secret.
    pub fn secret() -> Self {
        Self::new("", "v1", "Secret", "secrets", true)
    }

    /// `apiVersion` string (`group/version`, or just `version` for the core group).
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// A database engine managed by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum DatabaseEngine {
    Elasticsearch,
    Kafka,
    MariaDB,
    Memcached,
    MongoDB,
    MySQL,
    PerconaXtraDB,
    PgBouncer,
    Postgres,
    ProxySQL,
    Redis,
    RedisSentinel,
}

impl DatabaseEngine {
    /// Every supported engine.
    pub const ALL: [DatabaseEngine; 12] = [
        DatabaseEngine::Elasticsearch,
        DatabaseEngine::Kafka,
        DatabaseEngine::MariaDB,
        DatabaseEngine::Memcached,
        DatabaseEngine::MongoDB,
        DatabaseEngine::MySQL,
        DatabaseEngine::PerconaXtraDB,
        DatabaseEngine::PgBouncer,
        DatabaseEngine::Postgres,
        DatabaseEngine::ProxySQL,
        DatabaseEngine::Redis,
        DatabaseEngine::RedisSentinel,
    ];

    /// Kind of the managed database object (e.g. `MySQL`).
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseEngine::Elasticsearch => "Elasticsearch",
            DatabaseEngine::Kafka => "Kafka",
            DatabaseEngine::MariaDB => "MariaDB",
            DatabaseEngine::Memcached => "Memcached",
            DatabaseEngine::MongoDB => "MongoDB",
            DatabaseEngine::MySQL => "MySQL",
            DatabaseEngine::PerconaXtraDB => "PerconaXtraDB",
            DatabaseEngine::PgBouncer => "PgBouncer",
            DatabaseEngine::Postgres => "Postgres",
            DatabaseEngine::ProxySQL => "ProxySQL",
            DatabaseEngine::Redis => "Redis",
            DatabaseEngine::RedisSentinel => "RedisSentinel",
        }
    }

    fn plural(&self) -> String {
        let lower = self.kind().to_lowercase();
        match self {
            DatabaseEngine::Elasticsearch => "elasticsearches".to_string(),
            DatabaseEngine::PgBouncer => "pgbouncers".to_string(),
            DatabaseEngine::ProxySQL => "proxysqls".to_string(),
            _ => format!("{}s", lower),
        }
    }

    /// Kind of this engine's operation request (e.g. `MySQLOpsRequest`).
    pub fn ops_kind(&self) -> String {
        format!("{}OpsRequest", self.kind())
    }

    /// Managed database resource.
    pub fn database_resource(&self) -> ResourceKind {
        ResourceKind::new(
            DATABASE_GROUP,
            DATABASE_VERSION,
            self.kind(),
            &self.plural(),
            true,
        )
    }

    /// Operation request resource.
    pub fn ops_resource(&self) -> ResourceKind {
        let kind = self.ops_kind();
        let plural = format!("{}s", kind.to_lowercase());
        ResourceKind::new(OPS_GROUP, OPS_VERSION, &kind, &plural, true)
    }

    /// Version catalog resource (cluster scoped).
    pub fn version_resource(&self) -> ResourceKind {
        let kind = format!("{}Version", self.kind());
        let plural = format!("{}s", kind.to_lowercase());
        ResourceKind::new(CATALOG_GROUP, CATALOG_VERSION, &kind, &plural, false)
    }

    /// Resolve an engine from its operation request kind.
    pub fn from_ops_kind(kind: &str) -> Result<Self, Error> {
        let engine = kind
            .strip_suffix("OpsRequest")
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))?;
        engine
            .parse()
            .map_err(|_| Error::UnknownKind(kind.to_string()))
    }
}

impl FromStr for DatabaseEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseEngine::ALL
            .into_iter()
            .find(|engine| engine.kind() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}
