//! VolumeExpansion: grow the persistent volumes of one or more roles.
//!
//! Sizes only grow. A request at or below the current storage request of the
//! role is rejected, as is one for a role whose current size is unknown.

use std::cmp::Ordering;

use super::{OpsRule, RuleContext, check_shape, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};
use crate::validation::quantity::{compare_quantities, parse_quantity};

pub struct VolumeExpansionRule;

impl OpsRule for VolumeExpansionRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.volume_expansion else {
            errors.push(required_sub_spec(OpsRequestType::VolumeExpansion));
            return errors;
        };

        let path = sub_spec_path(OpsRequestType::VolumeExpansion);
        let Some(shape) = &ctx.profile.volume else {
            errors.push(FieldError::forbidden(
                path,
                format!("{} has no persistent storage to expand", ctx.engine_kind()),
            ));
            return errors;
        };

        errors.extend(check_shape(&path, spec.sizes.keys(), shape, ctx.is_clustered()));

        if ctx.database.is_ephemeral() {
            errors.push(FieldError::forbidden(
                path.as_str(),
                "can not expand volume of a database with Ephemeral storage",
            ));
            return errors;
        }

        for (field, desired) in &spec.sizes {
            let field_path = format!("{}.{}", path, field);
            if parse_quantity(&desired.0).is_none() {
                errors.push(FieldError::invalid(
                    field_path,
                    desired.0.as_str(),
                    "must be a valid storage quantity",
                ));
                continue;
            }
            let Some(current) = ctx.database.storage_request(field) else {
                errors.push(FieldError::invalid(
                    field_path,
                    desired.0.as_str(),
                    format!("current storage size of {} is unknown", field),
                ));
                continue;
            };
            match compare_quantities(&desired.0, &current.0) {
                Some(Ordering::Greater) => {}
                Some(_) => errors.push(FieldError::invalid(
                    field_path,
                    desired.0.as_str(),
                    format!("must be greater than current storage size {}", current.0),
                )),
                None => errors.push(FieldError::invalid(
                    field_path,
                    desired.0.as_str(),
                    format!("current storage size {} is not a valid quantity", current.0),
                )),
            }
        }

        errors
    }
}
