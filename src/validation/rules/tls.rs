//! ReconfigureTLS: add, rotate, change or remove TLS on a database.

use super::{OpsRule, RuleContext, required_sub_spec, sub_spec_path};
use crate::crd::OpsRequestType;
use crate::validation::field::{ErrorList, FieldError};
use crate::validation::version;

pub struct ReconfigureTlsRule;

impl OpsRule for ReconfigureTlsRule {
    fn validate(&self, ctx: &RuleContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(spec) = &ctx.request.spec.tls else {
            errors.push(required_sub_spec(OpsRequestType::ReconfigureTLS));
            return errors;
        };

        let path = sub_spec_path(OpsRequestType::ReconfigureTLS);
        let mechanisms = spec.mechanisms();
        match mechanisms.len() {
            0 => errors.push(FieldError::required(
                path.as_str(),
                "one of remove, rotateCertificates or issuerRef/certificates must be set",
            )),
            1 => {}
            _ => errors.push(FieldError::forbidden(
                path.as_str(),
                format!(
                    "only one of remove, rotateCertificates or issuerRef/certificates can be set, got {}",
                    mechanisms.join(", ")
                ),
            )),
        }

        let has_tls = ctx.database.has_tls();
        if spec.remove == Some(true) && !has_tls {
            errors.push(FieldError::invalid(
                format!("{}.remove", path),
                true,
                "database does not have TLS enabled",
            ));
        }
        if spec.rotate_certificates == Some(true) && !has_tls {
            errors.push(FieldError::invalid(
                format!("{}.rotateCertificates", path),
                true,
                "database does not have TLS enabled",
            ));
        }
        if spec.tls_config.is_set() && !has_tls && spec.tls_config.issuer_ref.is_none() {
            errors.push(FieldError::required(
                format!("{}.issuerRef", path),
                "issuerRef must be set to add TLS to a database",
            ));
        }

        if spec.require_ssl == Some(true) {
            if let Some(minimum) = ctx.profile.require_ssl_min_version {
                if !version::at_least(&ctx.database.spec.version, minimum) {
                    errors.push(FieldError::invalid(
                        format!("{}.requireSSL", path),
                        true,
                        format!(
                            "requireSSL is supported from {} version {}, database runs {}",
                            ctx.engine_kind(),
                            minimum,
                            ctx.database.spec.version
                        ),
                    ));
                }
            }
        }

        errors
    }
}
