//! Admission validation engine.
//!
//! - `ops`: `OpsRequestValidator` for every `<Engine>OpsRequest` kind
//! - `schema`: `SchemaValidator` for schema requests
//! - `rules` / `profiles`: per-operation rules and the per-engine tables
//! - `immutability`: update diffs and delete preconditions
//! - `phase`: lifecycle phase of schema requests
//! - `resolver`: point reads against the object store

pub mod field;
pub mod immutability;
pub mod ops;
pub mod phase;
pub mod profiles;
pub mod quantity;
pub mod resolver;
pub mod rules;
pub mod schema;
pub mod version;

pub use field::{ErrorCategory, ErrorList, ErrorType, FieldError, InvalidError};
pub use ops::{OpsRequestValidator, Warnings};
pub use phase::compute_phase;
pub use profiles::{EngineProfile, profile};
pub use resolver::{InMemoryStore, KubeStore, ObjectStore, ReferenceResolver, StoreError};
pub use rules::{Collaborators, OpsRule, RuleContext, rule_for};
pub use schema::SchemaValidator;
