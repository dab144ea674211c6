//! HorizontalScaling: new member, replica or shard counts.

use super::{OpsRule, RuleContext, check_shape, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};

pub struct HorizontalScalingRule;

impl OpsRule for HorizontalScalingRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.horizontal_scaling else {
            errors.push(required_sub_spec(OpsRequestType::HorizontalScaling));
            return errors;
        };

        let rules = &ctx.profile.horizontal;
        let path = sub_spec_path(OpsRequestType::HorizontalScaling);
        let clustered = ctx.is_clustered();
        errors.extend(check_shape(&path, spec.counts.keys(), &rules.shape, clustered));

        for (field, &count) in &spec.counts {
            let field_path = format!("{}.{}", path, field);
            if count <= 0 {
                errors.push(FieldError::invalid(
                    field_path,
                    count,
                    "must be greater than zero",
                ));
                continue;
            }
            if let Some(quorum) = rules.quorum.filter(|q| q.field == field.as_str()) {
                if !quorum.contains(count) {
                    errors.push(FieldError::invalid(field_path, count, quorum.message()));
                }
            }
        }

        if !rules.resizable_modes.is_empty() {
            let mode = ctx.database.topology_mode();
            if !mode.is_some_and(|m| rules.resizable_modes.contains(&m)) {
                errors.push(FieldError::forbidden(
                    path,
                    format!(
                        "horizontal scaling requires {} topology mode {}",
                        ctx.engine_kind(),
                        rules.resizable_modes.join(" or ")
                    ),
                ));
            }
        } else if rules.requires_clustered && !clustered {
            errors.push(FieldError::forbidden(
                path,
                format!(
                    "horizontal scaling requires a clustered {} database",
                    ctx.engine_kind()
                ),
            ));
        }

        errors
    }
}
