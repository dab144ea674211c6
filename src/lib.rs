//! dbops-webhook library crate
//!
//! Admission validation for database operation requests and schema
//! requests, plus the HTTPS webhook host and health server around it.

pub mod crd;
pub mod error;
pub mod health;
pub mod validation;
pub mod webhooks;

pub use error::{Error, Result};
pub use health::HealthState;
pub use validation::{
    ErrorList, FieldError, InMemoryStore, InvalidError, KubeStore, ObjectStore,
    OpsRequestValidator, SchemaValidator, compute_phase,
};
pub use webhooks::{WebhookConfig, WebhookError, WebhookState, run_webhook_server};
