//! Reconfigure: change the custom configuration of a database.

use super::{OpsRule, RuleContext, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};

pub struct ReconfigureRule;

impl OpsRule for ReconfigureRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.configuration else {
            errors.push(required_sub_spec(OpsRequestType::Reconfigure));
            return errors;
        };

        let path = sub_spec_path(OpsRequestType::Reconfigure);
        let mechanisms = spec.mechanisms();
        match mechanisms.len() {
            0 => {
                errors.push(FieldError::required(
                    path,
                    "one of removeCustomConfig, applyConfig or configSecret must be set",
                ));
                return errors;
            }
            1 => {}
            _ => {
                errors.push(FieldError::forbidden(
                    path,
                    format!(
                        "more than one operation requested ({}); only one of removeCustomConfig, applyConfig or configSecret can be set",
                        mechanisms.join(", ")
                    ),
                ));
                return errors;
            }
        }

        if spec.remove_custom_config == Some(true) && !ctx.database.has_custom_config() {
            errors.push(FieldError::invalid(
                format!("{}.removeCustomConfig", path),
                true,
                format!(
                    "{} {} has no custom config to remove",
                    ctx.engine_kind(),
                    ctx.database.metadata.name.as_deref().unwrap_or_default()
                ),
            ));
        }

        if let Some(secret) = &spec.config_secret {
            let secret_path = format!("{}.configSecret.name", path);
            if secret.name.is_empty() {
                errors.push(FieldError::required(secret_path, "config secret name must be set"));
            } else if !ctx.collaborators.secret_exists(&secret.name) {
                errors.push(FieldError::not_found(secret_path, secret.name.as_str()));
            }
        }

        errors
    }
}
