//! Operation requests: one administrative action against a managed database.
//!
//! Every engine has its own `<Engine>OpsRequest` kind, but all of them share
//! this shape. Shape field names inside the scaling and volume sub-specs are
//! engine specific and therefore kept as maps.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::common::{Condition, LocalObjectRef, PodResources, TlsConfig};

/// An operation request as decoded from an admission review.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequest {
    #[serde(default)]
    pub metadata: ObjectMeta,

    pub spec: OpsRequestSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OpsRequestStatus>,
}

/// Desired operation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequestSpec {
    /// The database this operation targets.
    #[serde(default)]
    pub database_ref: LocalObjectRef,

    /// Operation kind; must be one of the kinds legal for the engine.
    #[serde(rename = "type", default)]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_version: Option<UpdateVersionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_scaling: Option<HorizontalScalingSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_scaling: Option<VerticalScalingSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_expansion: Option<VolumeExpansionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ReconfigureSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<ReconfigureTlsSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<RotateAuthSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartSpec>,

    /// Maximum duration of the operation (e.g. "5m", "1h30m").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Whether the operation may run against a database that is not Ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply: Option<ApplyPolicy>,

    /// Spec fields not modeled above (`maxRetries`, `readinessCriteria`,
    /// engine-specific extras). Kept so updates to them can be detected.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OpsRequestSpec {
    /// JSON field names of the populated operation sub-specs.
    pub fn populated_sub_specs(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.update_version.is_some() {
            fields.push(OpsRequestType::UpdateVersion.field_name());
        }
        if self.horizontal_scaling.is_some() {
            fields.push(OpsRequestType::HorizontalScaling.field_name());
        }
        if self.vertical_scaling.is_some() {
            fields.push(OpsRequestType::VerticalScaling.field_name());
        }
        if self.volume_expansion.is_some() {
            fields.push(OpsRequestType::VolumeExpansion.field_name());
        }
        if self.configuration.is_some() {
            fields.push(OpsRequestType::Reconfigure.field_name());
        }
        if self.tls.is_some() {
            fields.push(OpsRequestType::ReconfigureTLS.field_name());
        }
        if self.authentication.is_some() {
            fields.push(OpsRequestType::RotateAuth.field_name());
        }
        if self.restart.is_some() {
            fields.push(OpsRequestType::Restart.field_name());
        }
        fields
    }
}

/// Operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum OpsRequestType {
    UpdateVersion,
    HorizontalScaling,
    VerticalScaling,
    VolumeExpansion,
    Restart,
    Reconfigure,
    #[serde(rename = "ReconfigureTLS")]
    ReconfigureTLS,
    RotateAuth,
}

impl OpsRequestType {
    pub const ALL: [OpsRequestType; 8] = [
        OpsRequestType::UpdateVersion,
        OpsRequestType::HorizontalScaling,
        OpsRequestType::VerticalScaling,
        OpsRequestType::VolumeExpansion,
        OpsRequestType::Restart,
        OpsRequestType::Reconfigure,
        OpsRequestType::ReconfigureTLS,
        OpsRequestType::RotateAuth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpsRequestType::UpdateVersion => "UpdateVersion",
            OpsRequestType::HorizontalScaling => "HorizontalScaling",
            OpsRequestType::VerticalScaling => "VerticalScaling",
            OpsRequestType::VolumeExpansion => "VolumeExpansion",
            OpsRequestType::Restart => "Restart",
            OpsRequestType::Reconfigure => "Reconfigure",
            OpsRequestType::ReconfigureTLS => "ReconfigureTLS",
            OpsRequestType::RotateAuth => "RotateAuth",
        }
    }

    /// JSON name of the sub-spec that carries this operation's parameters.
    pub fn field_name(&self) -> &'static str {
        match self {
            OpsRequestType::UpdateVersion => "updateVersion",
            OpsRequestType::HorizontalScaling => "horizontalScaling",
            OpsRequestType::VerticalScaling => "verticalScaling",
            OpsRequestType::VolumeExpansion => "volumeExpansion",
            OpsRequestType::Restart => "restart",
            OpsRequestType::Reconfigure => "configuration",
            OpsRequestType::ReconfigureTLS => "tls",
            OpsRequestType::RotateAuth => "authentication",
        }
    }
}

impl FromStr for OpsRequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Upgrade" is the pre-rename spelling of UpdateVersion
        if s == "Upgrade" {
            return Ok(OpsRequestType::UpdateVersion);
        }
        OpsRequestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for OpsRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Apply policy of an operation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ApplyPolicy {
    /// Run only when the database is Ready.
    #[default]
    IfReady,
    /// Run regardless of database health.
    Always,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVersionSpec {
    /// Name of the catalog entry to move to.
    #[serde(default)]
    pub target_version: String,
}

/// Replica/member counts keyed by engine-specific field name
/// (`member`, `replicas`, `shards`, `broker`, ...).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct HorizontalScalingSpec {
    #[serde(flatten)]
    pub counts: BTreeMap<String, i32>,
}

/// Compute resources keyed by engine-specific node or role name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VerticalScalingSpec {
    #[serde(flatten)]
    pub nodes: BTreeMap<String, PodResources>,
}

/// Whether a volume expansion may run with the database online.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum VolumeExpansionMode {
    Online,
    Offline,
}

/// Requested storage sizes keyed by engine-specific node or role name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VolumeExpansionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<VolumeExpansionMode>,

    #[serde(flatten)]
    pub sizes: BTreeMap<String, Quantity>,
}

/// Reconfigure has three mutually exclusive mechanisms.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigureSpec {
    /// Replace the custom configuration with the contents of this secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_secret: Option<LocalObjectRef>,

    /// Inline configuration, keyed by file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_config: Option<BTreeMap<String, String>>,

    /// Drop the custom configuration and fall back to defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_custom_config: Option<bool>,
}

impl ReconfigureSpec {
    /// JSON names of the mechanisms that are set.
    pub fn mechanisms(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.remove_custom_config == Some(true) {
            set.push("removeCustomConfig");
        }
        if self.apply_config.as_ref().is_some_and(|c| !c.is_empty()) {
            set.push("applyConfig");
        }
        if self.config_secret.is_some() {
            set.push("configSecret");
        }
        set
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigureTlsSpec {
    /// Issuer or certificate changes; inlined in the JSON.
    #[serde(flatten)]
    pub tls_config: TlsConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate_certificates: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,

    #[serde(rename = "requireSSL", default, skip_serializing_if = "Option::is_none")]
    pub require_ssl: Option<bool>,
}

impl ReconfigureTlsSpec {
    /// Names of the TLS mechanisms that are set.
    pub fn mechanisms(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.remove == Some(true) {
            set.push("remove");
        }
        if self.rotate_certificates == Some(true) {
            set.push("rotateCertificates");
        }
        if self.tls_config.is_set() {
            set.push("issuerRef/certificates");
        }
        set
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RotateAuthSpec {
    /// Use this secret instead of generating new credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalObjectRef>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RestartSpec {}

/// Status written by the reconciler; read-only here.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequestStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<OpsRequestPhase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum OpsRequestPhase {
    Pending,
    Progressing,
    Successful,
    Failed,
    Skipped,
}

impl OpsRequestStatus {
    /// True until the reconciler has started acting on the request.
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, None | Some(OpsRequestPhase::Pending))
    }
}

impl OpsRequest {
    /// True while no status phase past `Pending` has been recorded.
    pub fn is_pending(&self) -> bool {
        self.status.as_ref().is_none_or(OpsRequestStatus::is_pending)
    }
}
