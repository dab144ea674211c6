//! RotateAuth: rotate the admin credentials of a database.

use super::{OpsRule, RuleContext, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};
use crate::validation::version;

pub struct RotateAuthRule;

impl OpsRule for RotateAuthRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.authentication else {
            errors.push(required_sub_spec(OpsRequestType::RotateAuth));
            return errors;
        };

        let path = sub_spec_path(OpsRequestType::RotateAuth);
        if let Some(secret) = &spec.secret_ref {
            let secret_path = format!("{}.secretRef.name", path);
            if secret.name.is_empty() {
                errors.push(FieldError::required(secret_path, "secret name must be set"));
            } else if !ctx.collaborators.secret_exists(&secret.name) {
                errors.push(FieldError::not_found(secret_path, secret.name.as_str()));
            }
        }

        if let Some(max_major) = ctx.profile.rotate_auth_tls_above_major {
            let running = version::major(&ctx.database.spec.version);
            if running.is_some_and(|major| major > max_major) && !ctx.database.has_tls() {
                errors.push(FieldError::forbidden(
                    path,
                    format!(
                        "rotating auth of {} {} requires TLS for versions above {}",
                        ctx.engine_kind(),
                        ctx.database.spec.version,
                        max_major
                    ),
                ));
            }
        }

        errors
    }
}
