//! Admission webhook host.
//!
//! Decodes `AdmissionReview` calls, picks the validator by the request kind
//! and maps validation outcomes onto admission responses.

mod server;

pub use server::{
    HEALTH_PORT, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookConfig, WebhookError,
    WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
