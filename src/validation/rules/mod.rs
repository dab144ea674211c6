//! Per-operation-type rules for ops requests.
//!
//! One rule per operation kind, shared by all engines. A rule is a pure
//! function of the request, the resolved database, the engine profile and
//! the collaborators prefetched by the dispatcher. Rules collect every field
//! error under `spec.<subFieldName>` instead of stopping at the first one.

mod horizontal;
mod reconfigure;
mod restart;
mod rotate_auth;
mod tls;
mod update_version;
mod vertical;
mod volume;

use std::collections::BTreeMap;

use crate::crd::{CatalogVersion, ManagedDatabase, OpsRequest, OpsRequestType};

use super::field::{ErrorList, FieldError};
use super::profiles::{EngineProfile, FieldShape, ShapeFields};

pub use horizontal::HorizontalScalingRule;
pub use reconfigure::ReconfigureRule;
pub use restart::RestartRule;
pub use rotate_auth::RotateAuthRule;
pub use tls::ReconfigureTlsRule;
pub use update_version::UpdateVersionRule;
pub use vertical::VerticalScalingRule;
pub use volume::VolumeExpansionRule;

/// Objects other than the database that a rule may look at.
#[derive(Clone, Debug, Default)]
pub struct Collaborators {
    /// Catalog entry of `spec.updateVersion.targetVersion`.
    pub target_version: Option<CatalogVersion>,
    /// Catalog entry of the database's current version.
    pub current_version: Option<CatalogVersion>,
    /// Existence of the secrets the request refers to, by name.
    pub secrets: BTreeMap<String, bool>,
}

impl Collaborators {
    pub fn secret_exists(&self, name: &str) -> bool {
        self.secrets.get(name).copied().unwrap_or(false)
    }
}

/// Everything a rule may inspect.
pub struct RuleContext<'a> {
    pub request: &'a OpsRequest,
    pub database: &'a ManagedDatabase,
    pub profile: &'static EngineProfile,
    pub collaborators: &'a Collaborators,
}

impl RuleContext<'_> {
    pub fn is_clustered(&self) -> bool {
        self.profile.is_clustered(self.database)
    }

    pub fn engine_kind(&self) -> &'static str {
        self.profile.engine.kind()
    }
}

/// Validation of one operation kind.
pub trait OpsRule: Send + Sync {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList;
}

/// Rule for an operation kind.
pub fn rule_for(op: OpsRequestType) -> &'static dyn OpsRule {
    match op {
        OpsRequestType::UpdateVersion => &UpdateVersionRule,
        OpsRequestType::HorizontalScaling => &HorizontalScalingRule,
        OpsRequestType::VerticalScaling => &VerticalScalingRule,
        OpsRequestType::VolumeExpansion => &VolumeExpansionRule,
        OpsRequestType::Restart => &RestartRule,
        OpsRequestType::Reconfigure => &ReconfigureRule,
        OpsRequestType::ReconfigureTLS => &ReconfigureTlsRule,
        OpsRequestType::RotateAuth => &RotateAuthRule,
    }
}

fn sub_spec_path(op: OpsRequestType) -> String {
    format!("spec.{}", op.field_name())
}

fn required_sub_spec(op: OpsRequestType) -> FieldError {
    FieldError::required(
        sub_spec_path(op),
        format!("{} must be set for type {}", op.field_name(), op),
    )
}

/// Check the field names of a scaling or expansion sub-spec against the
/// engine's shape and the database topology.
fn check_shape<'f>(
    path: &str,
    fields: impl IntoIterator<Item = &'f String>,
    shape: &ShapeFields,
    clustered: bool,
) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut standalone_set: Option<&str> = None;
    let mut clustered_set: Option<&str> = None;
    let mut any = false;

    for field in fields {
        any = true;
        let field_path = format!("{}.{}", path, field);
        match shape.classify(field) {
            None => errors.push(FieldError::not_supported(
                field_path,
                field.as_str(),
                &shape.known(),
            )),
            Some(FieldShape::Shared) => {}
            Some(FieldShape::Standalone) => {
                if standalone_set.is_none() {
                    standalone_set = Some(field.as_str());
                }
                if clustered {
                    errors.push(FieldError::forbidden(
                        field_path,
                        "can not be set on a clustered database",
                    ));
                }
            }
            Some(FieldShape::Clustered) => {
                if clustered_set.is_none() {
                    clustered_set = Some(field.as_str());
                }
                if !clustered {
                    errors.push(FieldError::forbidden(
                        field_path,
                        "can only be set on a clustered database",
                    ));
                }
            }
        }
    }

    if !any {
        errors.push(FieldError::required(
            path,
            format!("at least one of {} must be set", shape.known().join(", ")),
        ));
    }

    if let (Some(single), Some(role)) = (standalone_set, clustered_set) {
        errors.push(FieldError::forbidden(
            path,
            format!("{} and {} can not be set together", single, role),
        ));
    }

    errors
}
