//! Per-engine rule parameters.
//!
//! Every engine shares the same rule per operation kind; what differs is
//! data: the operation kinds it accepts, how to tell a clustered database
//! from a standalone one, the field names of the scaling and expansion
//! sub-specs, quorum bounds and the TLS/auth gates.

use crate::crd::{DatabaseEngine, ManagedDatabase, OpsRequestType};

const ALL_OPS: &[OpsRequestType] = &OpsRequestType::ALL;

const NO_VOLUME: &[OpsRequestType] = &[
    OpsRequestType::UpdateVersion,
    OpsRequestType::HorizontalScaling,
    OpsRequestType::VerticalScaling,
    OpsRequestType::Restart,
    OpsRequestType::Reconfigure,
    OpsRequestType::ReconfigureTLS,
    OpsRequestType::RotateAuth,
];

const NO_VOLUME_NO_RECONFIGURE: &[OpsRequestType] = &[
    OpsRequestType::UpdateVersion,
    OpsRequestType::HorizontalScaling,
    OpsRequestType::VerticalScaling,
    OpsRequestType::Restart,
    OpsRequestType::ReconfigureTLS,
    OpsRequestType::RotateAuth,
];

/// How to decide whether a database runs clustered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clustering {
    /// The engine has no clustered topology.
    Never,
    /// Clustered when `spec.topology` declares dedicated roles.
    TopologyRoles,
    /// Clustered when `spec.topology.mode` is one of these.
    TopologyModeIn(&'static [&'static str]),
    /// Clustered when `spec.mode` is one of these.
    ModeIn(&'static [&'static str]),
    /// Clustered when `spec.replicas` exceeds the value.
    ReplicasAbove(i32),
}

/// Which topology a sub-spec field applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Shared,
    Standalone,
    Clustered,
}

/// Field names accepted inside a scaling or expansion sub-spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeFields {
    pub shared: &'static [&'static str],
    pub standalone: &'static [&'static str],
    pub clustered: &'static [&'static str],
}

impl ShapeFields {
    const fn shared(fields: &'static [&'static str]) -> Self {
        Self {
            shared: fields,
            standalone: &[],
            clustered: &[],
        }
    }

    pub fn classify(&self, field: &str) -> Option<FieldShape> {
        if self.shared.contains(&field) {
            Some(FieldShape::Shared)
        } else if self.standalone.contains(&field) {
            Some(FieldShape::Standalone)
        } else if self.clustered.contains(&field) {
            Some(FieldShape::Clustered)
        } else {
            None
        }
    }

    /// All known field names, in table order.
    pub fn known(&self) -> Vec<&'static str> {
        self.shared
            .iter()
            .chain(self.standalone)
            .chain(self.clustered)
            .copied()
            .collect()
    }
}

/// Bounds on the member count of a replication group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quorum {
    pub field: &'static str,
    pub min: i32,
    pub max: Option<i32>,
}

impl Quorum {
    pub fn contains(&self, count: i32) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    pub fn message(&self) -> String {
        match self.max {
            Some(max) => format!(
                "Group size can not be less than {} or greater than {}",
                self.min, max
            ),
            None => format!("Group size can not be less than {}", self.min),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HorizontalRules {
    pub shape: ShapeFields,
    pub quorum: Option<Quorum>,
    /// The database must already run clustered.
    pub requires_clustered: bool,
    /// When non-empty, `spec.topology.mode` must be one of these.
    pub resizable_modes: &'static [&'static str],
}

impl HorizontalRules {
    const fn plain(shape: ShapeFields) -> Self {
        Self {
            shape,
            quorum: None,
            requires_clustered: false,
            resizable_modes: &[],
        }
    }
}

/// Static rule parameters for one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineProfile {
    pub engine: DatabaseEngine,
    pub operations: &'static [OpsRequestType],
    pub clustering: Clustering,
    pub vertical: ShapeFields,
    pub horizontal: HorizontalRules,
    /// `None` for engines without persistent storage.
    pub volume: Option<ShapeFields>,
    /// Minimum engine version for `requireSSL`.
    pub require_ssl_min_version: Option<&'static str>,
    /// RotateAuth needs TLS above this major version.
    pub rotate_auth_tls_above_major: Option<u64>,
}

impl EngineProfile {
    pub fn supports(&self, op: OpsRequestType) -> bool {
        self.operations.contains(&op)
    }

    /// Operation kinds accepted by this engine, as they appear in `spec.type`.
    pub fn allowed_types(&self) -> Vec<&'static str> {
        self.operations.iter().map(OpsRequestType::as_str).collect()
    }

    pub fn is_clustered(&self, db: &ManagedDatabase) -> bool {
        match self.clustering {
            Clustering::Never => false,
            Clustering::TopologyRoles => db.has_topology_roles(),
            Clustering::TopologyModeIn(modes) => db
                .topology_mode()
                .is_some_and(|mode| modes.contains(&mode)),
            Clustering::ModeIn(modes) => db
                .spec
                .mode
                .as_deref()
                .is_some_and(|mode| modes.contains(&mode)),
            Clustering::ReplicasAbove(n) => db.replicas() > n,
        }
    }
}

const MYSQL_CLUSTER_MODES: &[&str] = &[
    "GroupReplication",
    "InnoDBCluster",
    "SemiSync",
    "RemoteReplica",
];
const MYSQL_RESIZABLE_MODES: &[&str] = &["GroupReplication", "InnoDBCluster"];

static ELASTICSEARCH: EngineProfile = EngineProfile {
    engine: DatabaseEngine::Elasticsearch,
    operations: ALL_OPS,
    clustering: Clustering::TopologyRoles,
    vertical: ShapeFields {
        shared: &["exporter"],
        standalone: &["node"],
        clustered: &["master", "ingest", "data"],
    },
    horizontal: HorizontalRules::plain(ShapeFields {
        shared: &[],
        standalone: &["node"],
        clustered: &["master", "ingest", "data"],
    }),
    volume: Some(ShapeFields {
        shared: &[],
        standalone: &["node"],
        clustered: &["master", "ingest", "data"],
    }),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static KAFKA: EngineProfile = EngineProfile {
    engine: DatabaseEngine::Kafka,
    operations: ALL_OPS,
    clustering: Clustering::TopologyRoles,
    vertical: ShapeFields {
        shared: &[],
        standalone: &["node"],
        clustered: &["broker", "controller"],
    },
    horizontal: HorizontalRules::plain(ShapeFields {
        shared: &[],
        standalone: &["node"],
        clustered: &["broker", "controller"],
    }),
    volume: Some(ShapeFields {
        shared: &[],
        standalone: &["node"],
        clustered: &["broker", "controller"],
    }),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static MARIADB: EngineProfile = EngineProfile {
    engine: DatabaseEngine::MariaDB,
    operations: ALL_OPS,
    clustering: Clustering::ReplicasAbove(1),
    vertical: ShapeFields::shared(&["mariadb", "coordinator", "exporter"]),
    horizontal: HorizontalRules {
        shape: ShapeFields::shared(&["member"]),
        quorum: Some(Quorum {
            field: "member",
            min: 3,
            max: None,
        }),
        requires_clustered: true,
        resizable_modes: &[],
    },
    volume: Some(ShapeFields::shared(&["mariadb"])),
    require_ssl_min_version: Some("10.5.2"),
    rotate_auth_tls_above_major: None,
};

static MEMCACHED: EngineProfile = EngineProfile {
    engine: DatabaseEngine::Memcached,
    operations: NO_VOLUME,
    clustering: Clustering::Never,
    vertical: ShapeFields::shared(&["memcached", "exporter"]),
    horizontal: HorizontalRules::plain(ShapeFields::shared(&["replicas"])),
    volume: None,
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static MONGODB: EngineProfile = EngineProfile {
    engine: DatabaseEngine::MongoDB,
    operations: ALL_OPS,
    clustering: Clustering::TopologyRoles,
    vertical: ShapeFields {
        shared: &["exporter", "arbiter", "hidden"],
        standalone: &["standalone"],
        clustered: &["replicaSet", "shard", "configServer", "mongos"],
    },
    horizontal: HorizontalRules::plain(ShapeFields {
        shared: &[],
        standalone: &[],
        clustered: &["replicas", "shards", "configServer", "mongos"],
    }),
    volume: Some(ShapeFields {
        shared: &[],
        standalone: &["standalone"],
        clustered: &["replicaSet", "shard", "configServer"],
    }),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static MYSQL: EngineProfile = EngineProfile {
    engine: DatabaseEngine::MySQL,
    operations: ALL_OPS,
    clustering: Clustering::TopologyModeIn(MYSQL_CLUSTER_MODES),
    vertical: ShapeFields::shared(&["mysql", "coordinator", "exporter"]),
    horizontal: HorizontalRules {
        shape: ShapeFields::shared(&["member"]),
        quorum: Some(Quorum {
            field: "member",
            min: 3,
            max: Some(9),
        }),
        requires_clustered: true,
        resizable_modes: MYSQL_RESIZABLE_MODES,
    },
    volume: Some(ShapeFields::shared(&["mysql"])),
    require_ssl_min_version: Some("5.7.0"),
    rotate_auth_tls_above_major: None,
};

static PERCONA_XTRADB: EngineProfile = EngineProfile {
    engine: DatabaseEngine::PerconaXtraDB,
    operations: ALL_OPS,
    clustering: Clustering::ReplicasAbove(1),
    vertical: ShapeFields::shared(&["perconaxtradb", "coordinator", "exporter"]),
    horizontal: HorizontalRules {
        shape: ShapeFields::shared(&["member"]),
        quorum: Some(Quorum {
            field: "member",
            min: 3,
            max: None,
        }),
        requires_clustered: true,
        resizable_modes: &[],
    },
    volume: Some(ShapeFields::shared(&["perconaxtradb"])),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static PGBOUNCER: EngineProfile = EngineProfile {
    engine: DatabaseEngine::PgBouncer,
    operations: NO_VOLUME,
    clustering: Clustering::Never,
    vertical: ShapeFields::shared(&["pgbouncer", "exporter"]),
    horizontal: HorizontalRules::plain(ShapeFields::shared(&["replicas"])),
    volume: None,
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static POSTGRES: EngineProfile = EngineProfile {
    engine: DatabaseEngine::Postgres,
    operations: ALL_OPS,
    clustering: Clustering::ReplicasAbove(1),
    vertical: ShapeFields::shared(&["postgres", "coordinator", "exporter"]),
    horizontal: HorizontalRules::plain(ShapeFields::shared(&["replicas"])),
    volume: Some(ShapeFields::shared(&["postgres"])),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static PROXYSQL: EngineProfile = EngineProfile {
    engine: DatabaseEngine::ProxySQL,
    operations: NO_VOLUME,
    clustering: Clustering::Never,
    vertical: ShapeFields::shared(&["proxysql", "exporter"]),
    horizontal: HorizontalRules::plain(ShapeFields::shared(&["member"])),
    volume: None,
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

static REDIS: EngineProfile = EngineProfile {
    engine: DatabaseEngine::Redis,
    operations: ALL_OPS,
    clustering: Clustering::ModeIn(&["Cluster", "Sentinel"]),
    vertical: ShapeFields {
        shared: &["exporter", "coordinator"],
        standalone: &["standalone"],
        clustered: &["cluster", "sentinel"],
    },
    horizontal: HorizontalRules::plain(ShapeFields {
        shared: &[],
        standalone: &[],
        clustered: &["shards", "replicas"],
    }),
    volume: Some(ShapeFields {
        shared: &[],
        standalone: &["standalone"],
        clustered: &["cluster"],
    }),
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: Some(6),
};

static REDIS_SENTINEL: EngineProfile = EngineProfile {
    engine: DatabaseEngine::RedisSentinel,
    operations: NO_VOLUME_NO_RECONFIGURE,
    clustering: Clustering::Never,
    vertical: ShapeFields::shared(&["redissentinel", "exporter"]),
    horizontal: HorizontalRules::plain(ShapeFields::shared(&["replicas"])),
    volume: None,
    require_ssl_min_version: None,
    rotate_auth_tls_above_major: None,
};

/// Rule parameters for an engine.
pub fn profile(engine: DatabaseEngine) -> &'static EngineProfile {
    match engine {
        DatabaseEngine::Elasticsearch => &ELASTICSEARCH,
        DatabaseEngine::Kafka => &KAFKA,
        DatabaseEngine::MariaDB => &MARIADB,
        DatabaseEngine::Memcached => &MEMCACHED,
        DatabaseEngine::MongoDB => &MONGODB,
        DatabaseEngine::MySQL => &MYSQL,
        DatabaseEngine::PerconaXtraDB => &PERCONA_XTRADB,
        DatabaseEngine::PgBouncer => &PGBOUNCER,
        DatabaseEngine::Postgres => &POSTGRES,
        DatabaseEngine::ProxySQL => &PROXYSQL,
        DatabaseEngine::Redis => &REDIS,
        DatabaseEngine::RedisSentinel => &REDIS_SENTINEL,
    }
}
