//! Admission validation of schema requests (MySQLDatabase, PostgresDatabase,
//! MongoDBDatabase).

use std::sync::Arc;

use jiff::SignedDuration;
use tracing::{Instrument, Span, debug, debug_span, info, warn};

use crate::crd::{DatabaseSchema, SCHEMA_GROUP, SchemaKind};
use crate::error::Result;

use super::field::{ErrorList, FieldError, InvalidError};
use super::immutability::{schema_delete_violations, schema_update_violations};
use super::ops::Warnings;
use super::resolver::{ObjectStore, ReferenceResolver};

/// Validates schema requests against an object store.
pub struct SchemaValidator<S> {
    store: Arc<S>,
    span: Span,
}

impl<S: ObjectStore> SchemaValidator<S> {
    pub fn new(store: Arc<S>, span: Span) -> Self {
        Self { store, span }
    }

    /// Structural checks plus existence of the referenced database.
    pub async fn validate_create(&self, kind: SchemaKind, schema: &DatabaseSchema) -> Result<Warnings> {
        let span = self.child_span("create", kind, schema);
        self.check_create(kind, schema).instrument(span).await
    }

    /// Immutability first; structural checks only when nothing frozen changed.
    pub async fn validate_update(
        &self,
        kind: SchemaKind,
        old: &DatabaseSchema,
        new: &DatabaseSchema,
    ) -> Result<Warnings> {
        let _span = self.child_span("update", kind, new).entered();

        let violations = schema_update_violations(old, new);
        if !violations.is_empty() {
            warn!(violations = violations.len(), "Rejected change to frozen schema fields");
            return Err(invalid(kind, new, violations).into());
        }

        let errors = validate_structure(kind, new);
        if !errors.is_empty() {
            info!(errors = errors.len(), "Schema request rejected");
            return Err(invalid(kind, new, errors).into());
        }
        Ok(Warnings::new())
    }

    pub async fn validate_delete(&self, kind: SchemaKind, schema: &DatabaseSchema) -> Result<Warnings> {
        let _span = self.child_span("delete", kind, schema).entered();

        let violations = schema_delete_violations(kind, schema);
        if !violations.is_empty() {
            info!("Schema deletion rejected");
            return Err(invalid(kind, schema, violations).into());
        }
        debug!("Schema deletion allowed");
        Ok(Warnings::new())
    }

    fn child_span(&self, operation: &str, kind: SchemaKind, schema: &DatabaseSchema) -> Span {
        debug_span!(
            parent: &self.span,
            "validate_schema",
            operation,
            kind = %kind,
            name = schema.metadata.name.as_deref().unwrap_or_default(),
            namespace = schema.metadata.namespace.as_deref().unwrap_or_default(),
        )
    }

    async fn check_create(&self, kind: SchemaKind, schema: &DatabaseSchema) -> Result<Warnings> {
        let mut errors = validate_structure(kind, schema);

        let db_ref = &schema.spec.database_ref;
        if !db_ref.name.is_empty() {
            let namespace = db_ref
                .namespace
                .as_deref()
                .or(schema.metadata.namespace.as_deref())
                .unwrap_or_default();
            let resolver = ReferenceResolver::new(self.store.as_ref());
            let engine = kind.engine();
            if resolver
                .resolve_database(engine, namespace, &db_ref.name)
                .await?
                .is_none()
            {
                errors.push(
                    FieldError::not_found("spec.databaseRef", db_ref.name.as_str()).with_detail(
                        format!("{} {}/{} does not exist", engine, namespace, db_ref.name),
                    ),
                );
            }
        }

        if !errors.is_empty() {
            info!(errors = errors.len(), "Schema request rejected");
            return Err(invalid(kind, schema, errors).into());
        }
        debug!("Schema request accepted");
        Ok(Warnings::new())
    }
}

fn invalid(kind: SchemaKind, schema: &DatabaseSchema, errors: ErrorList) -> InvalidError {
    InvalidError::new(
        SCHEMA_GROUP,
        kind.kind(),
        schema.metadata.name.clone().unwrap_or_default(),
        errors,
    )
}

/// Checks that need no lookups.
fn validate_structure(kind: SchemaKind, schema: &DatabaseSchema) -> ErrorList {
    let mut errors = ErrorList::new();
    let spec = &schema.spec;

    if spec.database_ref.name.is_empty() {
        errors.push(FieldError::required("spec.databaseRef.name", "database reference must be set"));
    }
    if spec.vault_ref.name.is_empty() {
        errors.push(FieldError::required("spec.vaultRef.name", "vault reference must be set"));
    }

    let name = spec.database_config.name.as_str();
    if name.is_empty() {
        errors.push(FieldError::required("spec.databaseConfig.name", "database name must be set"));
    } else if kind.reserved_names().contains(&name.to_lowercase().as_str()) {
        errors.push(FieldError::invalid(
            "spec.databaseConfig.name",
            name,
            format!("{} is a reserved {} database name", name, kind.engine()),
        ));
    }

    if let Some(read_only) = spec.database_config.read_only {
        if !kind.supports_read_only() {
            errors.push(FieldError::forbidden(
                "spec.databaseConfig.readOnly",
                format!("readOnly is not supported for {}", kind.kind()),
            ));
        } else if !(0..=1).contains(&read_only) {
            errors.push(FieldError::not_supported(
                "spec.databaseConfig.readOnly",
                read_only,
                &["0", "1"],
            ));
        }
    }

    if let Some(init) = &spec.init {
        match (&init.script, &init.snapshot) {
            (Some(_), Some(_)) => errors.push(FieldError::forbidden(
                "spec.init",
                "script and snapshot can not be set together",
            )),
            (None, None) => errors.push(FieldError::required(
                "spec.init",
                "one of script or snapshot must be set",
            )),
            _ => {}
        }
    }

    let policy = &spec.access_policy;
    if policy.subjects.is_empty() {
        errors.push(FieldError::required(
            "spec.accessPolicy.subjects",
            "at least one subject must be set",
        ));
    }
    for (i, subject) in policy.subjects.iter().enumerate() {
        if subject.kind.is_empty() {
            errors.push(FieldError::required(
                format!("spec.accessPolicy.subjects[{}].kind", i),
                "subject kind must be set",
            ));
        }
        if subject.name.is_empty() {
            errors.push(FieldError::required(
                format!("spec.accessPolicy.subjects[{}].name", i),
                "subject name must be set",
            ));
        }
    }

    let default_ttl = parse_ttl("spec.accessPolicy.defaultTTL", policy.default_ttl.as_deref(), &mut errors);
    let max_ttl = parse_ttl("spec.accessPolicy.maxTTL", policy.max_ttl.as_deref(), &mut errors);
    if let (Some(default_ttl), Some(max_ttl)) = (default_ttl, max_ttl) {
        if default_ttl > max_ttl {
            errors.push(FieldError::invalid(
                "spec.accessPolicy.defaultTTL",
                policy.default_ttl.as_deref().unwrap_or_default(),
                format!(
                    "must not exceed maxTTL {}",
                    policy.max_ttl.as_deref().unwrap_or_default()
                ),
            ));
        }
    }

    errors
}

fn parse_ttl(path: &str, raw: Option<&str>, errors: &mut ErrorList) -> Option<SignedDuration> {
    let raw = raw?;
    match raw.parse::<SignedDuration>() {
        Ok(d) if d.is_positive() => Some(d),
        Ok(_) => {
            errors.push(FieldError::invalid(path, raw, "must be a positive duration"));
            None
        }
        Err(e) => {
            errors.push(FieldError::invalid(
                path,
                raw,
                format!("must be a duration such as 1h or 24h: {}", e),
            ));
            None
        }
    }
}
