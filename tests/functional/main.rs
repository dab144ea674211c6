// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the admission validators.
//!
//! These tests drive `OpsRequestValidator` and `SchemaValidator` end to end
//! against an in-memory object store, WITHOUT a Kubernetes cluster.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run the engine matrix only
//! cargo test --test functional engine_matrix
//! ```
//!
//! ## Test Categories
//!
//! - **Engine matrix**: every engine × operation kind, valid and with the
//!   sub-spec removed
//! - **Ops scenarios**: per-rule acceptance and rejection paths
//! - **Schema tests**: create, update and delete of schema requests
//! - **Phase tests**: lifecycle phase derivation

#[path = "../common/fixtures.rs"]
mod fixtures;

mod engine_matrix_tests;
mod ops_scenario_tests;
mod phase_tests;

use dbops_webhook::error::Error;
use dbops_webhook::validation::{FieldError, InvalidError};

/// Unwrap the field errors of a rejected admission call.
pub fn rejection<T: std::fmt::Debug>(result: Result<T, Error>) -> InvalidError {
    match result {
        Err(Error::Invalid(invalid)) => *invalid,
        other => panic!("expected an Invalid rejection, got {:?}", other),
    }
}

/// The error at `field`, if any.
pub fn error_at<'a>(invalid: &'a InvalidError, field: &str) -> Option<&'a FieldError> {
    invalid.errors.iter().find(|e| e.field == field)
}
