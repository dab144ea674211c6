//! Update-time immutability and delete preconditions.
//!
//! Ops requests are frozen after creation: any change under `spec` is
//! rejected, one error per changed leaf. Schema requests freeze once they
//! carry a finalizer, and refuse deletion under `DoNotDelete` or while a
//! MySQL schema is pinned read-only.

use serde_json::Value;

use crate::crd::{
    DatabaseSchema, DeletionPolicy, OpsRequest, SchemaConditionType, SchemaKind,
    is_condition_true,
};

use super::field::{ErrorList, FieldError};

const IMMUTABLE: &str = "field is immutable";

/// Changed leaf paths between the `spec` of two ops requests.
pub fn ops_spec_changes(old: &OpsRequest, new: &OpsRequest) -> Result<ErrorList, serde_json::Error> {
    let old_spec = serde_json::to_value(&old.spec)?;
    let new_spec = serde_json::to_value(&new.spec)?;

    let mut paths = Vec::new();
    diff_values("spec", &old_spec, &new_spec, &mut paths);

    Ok(paths
        .into_iter()
        .map(|path| FieldError::immutable(path, IMMUTABLE))
        .collect())
}

/// Collect the paths where two JSON values differ. Objects recurse per key
/// and arrays per index; anything else differing is a leaf.
fn diff_values(path: &str, old: &Value, new: &Value, paths: &mut Vec<String>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{}.{}", path, key);
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => diff_values(&child, x, y, paths),
                    _ => paths.push(child),
                }
            }
        }
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
            for (i, (x, y)) in a.iter().zip(b).enumerate() {
                diff_values(&format!("{}[{}]", path, i), x, y, paths);
            }
        }
        (a, b) if a != b => paths.push(path.to_string()),
        _ => {}
    }
}

/// Violations of the frozen fields of a schema request.
///
/// Only enforced once the old object carries a finalizer, meaning the
/// reconciler has started acting on it.
pub fn schema_update_violations(old: &DatabaseSchema, new: &DatabaseSchema) -> ErrorList {
    let mut errors = ErrorList::new();
    if !old.has_finalizers() {
        return errors;
    }

    if old.spec.database_ref != new.spec.database_ref {
        errors.push(FieldError::immutable("spec.databaseRef", IMMUTABLE));
    }
    if old.spec.vault_ref != new.spec.vault_ref {
        errors.push(FieldError::immutable("spec.vaultRef", IMMUTABLE));
    }
    if old.spec.access_policy != new.spec.access_policy {
        errors.push(FieldError::immutable("spec.accessPolicy", IMMUTABLE));
    }

    match (&old.spec.init, &new.spec.init) {
        (None, _) => {}
        (Some(a), Some(b)) if a.same_source(b) => {}
        _ => errors.push(FieldError::immutable(
            "spec.init",
            "can not be changed once set",
        )),
    }

    if let (Some(a), Some(b)) = (&old.spec.init, &new.spec.init) {
        if !a.initialized && b.initialized {
            errors.push(FieldError::immutable(
                "spec.init.initialized",
                "can only be set by the operator",
            ));
        }
    }

    let created = is_condition_true(old.conditions(), SchemaConditionType::DatabaseCreated.as_str());
    if created && old.spec.database_config.name != new.spec.database_config.name {
        errors.push(FieldError::immutable(
            "spec.databaseConfig.name",
            "can not be changed after the database is created",
        ));
    }

    errors
}

/// Reasons a schema request may not be deleted.
pub fn schema_delete_violations(kind: SchemaKind, schema: &DatabaseSchema) -> ErrorList {
    let mut errors = ErrorList::new();

    if schema.spec.deletion_policy == DeletionPolicy::DoNotDelete {
        errors.push(FieldError::forbidden(
            "spec.deletionPolicy",
            "can not delete while deletionPolicy is DoNotDelete",
        ));
    }

    if kind.supports_read_only() && schema.spec.database_config.is_read_only() {
        errors.push(FieldError::forbidden(
            "spec.databaseConfig.readOnly",
            "can not delete a read-only database, set readOnly to 0 first",
        ));
    }

    errors
}
