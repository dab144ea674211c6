//! Lifecycle phase of a schema request.
//!
//! The phase is derived on demand from metadata, the stored phase and the
//! condition list. Rules are evaluated top to bottom and the first match
//! wins; the order is part of the contract.

use crate::crd::{DatabaseSchema, SchemaConditionType, SchemaKind, SchemaPhase, is_condition_true};

/// Reduce a schema request to its lifecycle phase.
pub fn compute_phase(kind: SchemaKind, schema: &DatabaseSchema) -> SchemaPhase {
    let conditions = schema.conditions();
    let is_true = |t: SchemaConditionType| is_condition_true(conditions, t.as_str());

    if schema.metadata.deletion_timestamp.is_some() {
        return SchemaPhase::Terminating;
    }
    if is_true(SchemaConditionType::SecretAccessRequestExpired) {
        return SchemaPhase::Expired;
    }
    if schema.status.as_ref().and_then(|s| s.phase) == Some(SchemaPhase::Success) {
        return SchemaPhase::Success;
    }
    if is_true(SchemaConditionType::SchemaIgnored) {
        return SchemaPhase::Failed;
    }
    if is_condition_true(conditions, &kind.not_ready_condition()) {
        return SchemaPhase::Waiting;
    }
    if is_true(SchemaConditionType::VaultNotReady) {
        return SchemaPhase::Waiting;
    }
    if is_true(SchemaConditionType::SecretAccessRequestCreated)
        && !is_true(SchemaConditionType::SecretAccessRequestApproved)
    {
        return if is_true(SchemaConditionType::SecretAccessRequestDenied) {
            SchemaPhase::Failed
        } else {
            SchemaPhase::Waiting
        };
    }
    if is_true(SchemaConditionType::DatabaseCreated) {
        let init = schema.spec.init.as_ref();
        let snapshot = init.is_some_and(|i| i.snapshot.is_some());

        if init.is_some() && is_true(SchemaConditionType::FailedInitializing) {
            return SchemaPhase::Failed;
        }
        if init.is_some() && !is_true(SchemaConditionType::ScriptApplied) {
            return SchemaPhase::Running;
        }
        if snapshot && is_true(SchemaConditionType::FailedRestoring) {
            return SchemaPhase::Failed;
        }
        if snapshot && !is_true(SchemaConditionType::RestoredFromRepository) {
            return SchemaPhase::Running;
        }
        return SchemaPhase::Success;
    }

    SchemaPhase::Waiting
}
