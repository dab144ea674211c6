//! Admission validation of ops requests.
//!
//! `OpsRequestValidator` routes create, update and delete calls for every
//! `<Engine>OpsRequest` kind. Common spec checks run first, then the
//! referenced database and collaborators are resolved, then the rule for the
//! declared operation type. All field errors end up in one `InvalidError`.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::SignedDuration;
use tracing::{Instrument, Span, debug, debug_span, info, warn};

use crate::crd::{
    ApplyPolicy, DatabaseEngine, ManagedDatabase, OPS_GROUP, OpsRequest, OpsRequestSpec,
    OpsRequestType,
};
use crate::error::Result;

use super::field::{ErrorCategory, ErrorList, FieldError, InvalidError};
use super::immutability::ops_spec_changes;
use super::profiles::{EngineProfile, profile};
use super::resolver::{ObjectStore, ReferenceResolver};
use super::rules::{Collaborators, RuleContext, rule_for};

/// Non-fatal admission warnings returned to the client.
pub type Warnings = Vec<String>;

/// Validates ops requests of all engines against an object store.
pub struct OpsRequestValidator<S> {
    store: Arc<S>,
    span: Span,
}

impl<S: ObjectStore> OpsRequestValidator<S> {
    /// Create a validator. Log events are emitted inside `span`.
    pub fn new(store: Arc<S>, span: Span) -> Self {
        Self { store, span }
    }

    pub async fn validate_create(&self, engine: DatabaseEngine, request: &OpsRequest) -> Result<Warnings> {
        let span = self.child_span("create", engine, request);
        self.validate(engine, request).instrument(span).await
    }

    /// Reject any change to the spec. While the old object is still pending
    /// the new one is then validated as on create; once the reconciler has
    /// picked the request up, metadata-only updates are admitted as is.
    pub async fn validate_update(
        &self,
        engine: DatabaseEngine,
        old: &OpsRequest,
        new: &OpsRequest,
    ) -> Result<Warnings> {
        let span = self.child_span("update", engine, new);
        self.check_update(engine, old, new).instrument(span).await
    }

    /// Deleting an ops request is always allowed.
    pub async fn validate_delete(&self, engine: DatabaseEngine, request: &OpsRequest) -> Result<Warnings> {
        let _span = self.child_span("delete", engine, request).entered();
        debug!("Ops request deletion allowed");
        Ok(Warnings::new())
    }

    fn child_span(&self, operation: &str, engine: DatabaseEngine, request: &OpsRequest) -> Span {
        debug_span!(
            parent: &self.span,
            "validate_ops_request",
            operation,
            kind = %engine.ops_kind(),
            name = request.metadata.name.as_deref().unwrap_or_default(),
            namespace = request.metadata.namespace.as_deref().unwrap_or_default(),
            op_type = %request.spec.type_,
        )
    }

    async fn check_update(
        &self,
        engine: DatabaseEngine,
        old: &OpsRequest,
        new: &OpsRequest,
    ) -> Result<Warnings> {
        let changes = ops_spec_changes(old, new)?;
        if !changes.is_empty() {
            warn!(changes = changes.len(), "Rejected change to immutable ops request spec");
            return Err(invalid(engine, new, changes).into());
        }
        if !old.is_pending() {
            debug!("Ops request already picked up, skipping rule validation");
            return Ok(Warnings::new());
        }
        self.validate(engine, new).await
    }

    async fn validate(&self, engine: DatabaseEngine, request: &OpsRequest) -> Result<Warnings> {
        let profile = profile(engine);
        let (mut errors, op) = validate_common(profile, &request.spec);

        let resolver = ReferenceResolver::new(self.store.as_ref());
        let namespace = request.metadata.namespace.as_deref().unwrap_or_default();
        let db_name = request.spec.database_ref.name.as_str();

        let database = if db_name.is_empty() {
            None
        } else {
            let db = resolver.resolve_database(engine, namespace, db_name).await?;
            if db.is_none() {
                errors.push(FieldError::not_found("spec.databaseRef", db_name).with_detail(format!(
                    "{} {}/{} does not exist",
                    engine.kind(),
                    namespace,
                    db_name
                )));
            }
            db
        };

        if let (Some(op), Some(database), true) = (op, &database, errors.is_empty()) {
            let collaborators = prefetch(&resolver, engine, namespace, op, request, database).await?;
            let ctx = RuleContext {
                request,
                database,
                profile,
                collaborators: &collaborators,
            };
            errors.extend(rule_for(op).validate(&ctx));
        }

        if !errors.is_empty() {
            info!(errors = errors.len(), "Ops request rejected");
            return Err(invalid(engine, request, errors).into());
        }

        let mut warnings = Warnings::new();
        if request.spec.apply == Some(ApplyPolicy::Always) {
            warnings.push(format!(
                "apply is Always: the operation may run while {} {} is not Ready",
                engine.kind(),
                db_name
            ));
        }
        debug!(warnings = warnings.len(), "Ops request accepted");
        Ok(warnings)
    }
}

fn invalid(engine: DatabaseEngine, request: &OpsRequest, errors: ErrorList) -> InvalidError {
    InvalidError::new(
        OPS_GROUP,
        engine.ops_kind(),
        request.metadata.name.clone().unwrap_or_default(),
        errors,
    )
}

/// Checks that need no lookups: reference name, type, sub-spec consistency
/// and timeout. Returns the parsed type when it is legal for the engine.
fn validate_common(profile: &EngineProfile, spec: &OpsRequestSpec) -> (ErrorList, Option<OpsRequestType>) {
    let mut errors = ErrorList::new();

    if spec.database_ref.name.is_empty() {
        errors.push(FieldError::required(
            "spec.databaseRef.name",
            "database reference name must be set",
        ));
    }

    let op = if spec.type_.is_empty() {
        errors.push(FieldError::required("spec.type", "operation type must be set"));
        None
    } else {
        match spec.type_.parse::<OpsRequestType>() {
            Ok(op) if profile.supports(op) => Some(op),
            _ => {
                errors.push(
                    FieldError::not_supported(
                        "spec.type",
                        spec.type_.as_str(),
                        &profile.allowed_types(),
                    )
                    .with_category(ErrorCategory::UnsupportedType),
                );
                None
            }
        }
    };

    if let Some(op) = op {
        let expected = op.field_name();
        let populated = spec.populated_sub_specs();
        if op != OpsRequestType::Restart && !populated.contains(&expected) {
            errors.push(FieldError::required(
                format!("spec.{}", expected),
                format!("{} must be set for type {}", expected, op),
            ));
        }
        for other in populated.into_iter().filter(|f| *f != expected) {
            errors.push(FieldError::forbidden(
                format!("spec.{}", other),
                format!("must not be set for type {}", op),
            ));
        }
    }

    if let Some(timeout) = &spec.timeout {
        match timeout.parse::<SignedDuration>() {
            Ok(d) if d.is_positive() => {}
            Ok(_) => errors.push(FieldError::invalid(
                "spec.timeout",
                timeout.as_str(),
                "must be a positive duration",
            )),
            Err(e) => errors.push(FieldError::invalid(
                "spec.timeout",
                timeout.as_str(),
                format!("must be a duration such as 5m or 1h30m: {}", e),
            )),
        }
    }

    (errors, op)
}

/// Fetch the objects the rule for `op` looks at.
async fn prefetch<S: ObjectStore>(
    resolver: &ReferenceResolver<'_, S>,
    engine: DatabaseEngine,
    namespace: &str,
    op: OpsRequestType,
    request: &OpsRequest,
    database: &ManagedDatabase,
) -> Result<Collaborators> {
    let mut collaborators = Collaborators::default();
    let spec = &request.spec;

    match op {
        OpsRequestType::UpdateVersion => {
            if let Some(target) = spec.update_version.as_ref().map(|u| u.target_version.as_str()) {
                if !target.is_empty() {
                    collaborators.target_version = resolver.resolve_version(engine, target).await?;
                }
            }
            if !database.spec.version.is_empty() {
                collaborators.current_version =
                    resolver.resolve_version(engine, &database.spec.version).await?;
            }
        }
        OpsRequestType::Reconfigure => {
            let name = spec
                .configuration
                .as_ref()
                .and_then(|c| c.config_secret.as_ref())
                .map(|s| s.name.as_str());
            check_secret(resolver, namespace, name, &mut collaborators.secrets).await?;
        }
        OpsRequestType::RotateAuth => {
            let name = spec
                .authentication
                .as_ref()
                .and_then(|a| a.secret_ref.as_ref())
                .map(|s| s.name.as_str());
            check_secret(resolver, namespace, name, &mut collaborators.secrets).await?;
        }
        OpsRequestType::HorizontalScaling
        | OpsRequestType::VerticalScaling
        | OpsRequestType::VolumeExpansion
        | OpsRequestType::Restart
        | OpsRequestType::ReconfigureTLS => {}
    }

    Ok(collaborators)
}

async fn check_secret<S: ObjectStore>(
    resolver: &ReferenceResolver<'_, S>,
    namespace: &str,
    name: Option<&str>,
    secrets: &mut BTreeMap<String, bool>,
) -> Result<()> {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let exists = resolver.secret_exists(namespace, name).await?;
        secrets.insert(name.to_string(), exists);
    }
    Ok(())
}
