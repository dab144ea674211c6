//! UpdateVersion: move a database to another catalog version.
//!
//! The target must exist in the catalog and not be deprecated. The current
//! version must exist in the catalog too. When its entry declares update
//! constraints for the database topology, the target must match the
//! allowlist (if any) and must not match the denylist.

use super::{OpsRule, RuleContext, required_sub_spec, sub_spec_path};
use crate::crd::{CatalogVersion, OpsRequestType};
use crate::validation::field::{ErrorList, FieldError};
use crate::validation::version::matches_constraint;

pub struct UpdateVersionRule;

impl OpsRule for UpdateVersionRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.update_version else {
            errors.push(required_sub_spec(OpsRequestType::UpdateVersion));
            return errors;
        };

        let path = format!("{}.targetVersion", sub_spec_path(OpsRequestType::UpdateVersion));
        let target = spec.target_version.as_str();
        if target.is_empty() {
            errors.push(FieldError::required(path, "target version must be set"));
            return errors;
        }

        let Some(catalog) = &ctx.collaborators.target_version else {
            errors.push(FieldError::not_found(path, target).with_detail(format!(
                "{}Version \"{}\" does not exist",
                ctx.engine_kind(),
                target
            )));
            return errors;
        };

        if catalog.spec.deprecated {
            errors.push(FieldError::invalid(
                path.as_str(),
                target,
                format!("{}Version {} is deprecated", ctx.engine_kind(), target),
            ));
        }

        match &ctx.collaborators.current_version {
            Some(current) => check_constraints(ctx, current, catalog, &path, &mut errors),
            None => {
                let current = ctx.database.spec.version.as_str();
                errors.push(FieldError::not_found("spec.databaseRef", current).with_detail(
                    format!("{}Version \"{}\" does not exist", ctx.engine_kind(), current),
                ));
            }
        }

        errors
    }
}

fn check_constraints(
    ctx: &RuleContext<'_>,
    current: &CatalogVersion,
    target: &CatalogVersion,
    path: &str,
    errors: &mut ErrorList,
) {
    let Some(constraints) = &current.spec.update_constraints else {
        return;
    };
    let clustered = ctx.is_clustered();
    let topology = if clustered { "cluster" } else { "standalone" };
    let target_version = if target.spec.version.is_empty() {
        target.metadata.name.as_deref().unwrap_or_default()
    } else {
        target.spec.version.as_str()
    };
    let current_name = current.metadata.name.as_deref().unwrap_or_default();
    let requested = ctx
        .request
        .spec
        .update_version
        .as_ref()
        .map(|u| u.target_version.as_str())
        .unwrap_or(target_version);

    let matches = |constraint: &String| {
        matches_constraint(target_version, constraint).unwrap_or(false)
    };

    if let Some(allowlist) = &constraints.allowlist {
        let allowed = allowlist.for_topology(clustered);
        if !allowed.is_empty() && !allowed.iter().any(matches) {
            errors.push(FieldError::invalid(
                path,
                requested,
                format!(
                    "update from {} to {} is not in the {} allowlist [{}]",
                    current_name,
                    target_version,
                    topology,
                    allowed.join(", ")
                ),
            ));
        }
    }

    if let Some(denylist) = &constraints.denylist {
        if let Some(denied) = denylist.for_topology(clustered).iter().find(|c| matches(c)) {
            errors.push(FieldError::invalid(
                path,
                requested,
                format!(
                    "update from {} to {} is denied by the {} denylist entry \"{}\"",
                    current_name, target_version, topology, denied
                ),
            ));
        }
    }
}
