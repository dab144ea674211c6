//! VerticalScaling: new compute resources for one or more node roles.

use std::cmp::Ordering;

use k8s_openapi::api::core::v1::ResourceRequirements;

use super::{OpsRule, RuleContext, check_shape, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};
use crate::validation::quantity::{compare_quantities, parse_quantity};

pub struct VerticalScalingRule;

impl OpsRule for VerticalScalingRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.vertical_scaling else {
            errors.push(required_sub_spec(OpsRequestType::VerticalScaling));
            return errors;
        };

        let path = sub_spec_path(OpsRequestType::VerticalScaling);
        errors.extend(check_shape(
            &path,
            spec.nodes.keys(),
            &ctx.profile.vertical,
            ctx.is_clustered(),
        ));

        for (node, pod) in &spec.nodes {
            let resources_path = format!("{}.{}.resources", path, node);
            match &pod.resources {
                Some(resources) if has_requests_or_limits(resources) => {
                    errors.extend(check_requests_within_limits(&resources_path, resources));
                }
                _ => errors.push(FieldError::required(
                    resources_path,
                    "resource requests or limits must be set",
                )),
            }
        }

        errors
    }
}

fn has_requests_or_limits(resources: &ResourceRequirements) -> bool {
    resources.requests.as_ref().is_some_and(|r| !r.is_empty())
        || resources.limits.as_ref().is_some_and(|l| !l.is_empty())
}

fn check_requests_within_limits(path: &str, resources: &ResourceRequirements) -> ErrorList {
    let mut errors = ErrorList::new();

    for (section, values) in [("requests", &resources.requests), ("limits", &resources.limits)] {
        for (name, quantity) in values.iter().flatten() {
            if parse_quantity(&quantity.0).is_none() {
                errors.push(FieldError::invalid(
                    format!("{}.{}.{}", path, section, name),
                    quantity.0.as_str(),
                    "must be a valid resource quantity",
                ));
            }
        }
    }

    let (Some(requests), Some(limits)) = (&resources.requests, &resources.limits) else {
        return errors;
    };

    for name in ["cpu", "memory"] {
        let (Some(request), Some(limit)) = (requests.get(name), limits.get(name)) else {
            continue;
        };
        if compare_quantities(&request.0, &limit.0) == Some(Ordering::Greater) {
            errors.push(FieldError::invalid(
                format!("{}.requests.{}", path, name),
                request.0.as_str(),
                format!("must be less than or equal to {} limit {}", name, limit.0),
            ));
        }
    }

    errors
}
