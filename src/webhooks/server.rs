//! Admission webhook server.
//!
//! Provides HTTPS endpoints for the ValidatingWebhookConfiguration:
//! - `POST /validate/opsrequests` for every `<Engine>OpsRequest` kind
//! - `POST /validate/schemas` for `MySQLDatabase`, `PostgresDatabase` and
//!   `MongoDBDatabase`
//!
//! The certificate and key are read from the paths in [`WebhookConfig`],
//! usually a cert-manager secret mounted at `/etc/webhook/certs/`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::response::StatusSummary;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{Span, debug, error, info, warn};

use crate::crd::{DatabaseEngine, SchemaKind};
use crate::error::{Error, Result};
use crate::health::{AdmissionResult, HealthState};
use crate::validation::{ObjectStore, OpsRequestValidator, SchemaValidator, Warnings};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Default health server port
pub const HEALTH_PORT: u16 = 8080;

/// Errors that can occur when configuring or running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Listener settings, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    pub port: u16,
    pub health_port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
        }
    }
}

impl WebhookConfig {
    /// Read `WEBHOOK_PORT`, `HEALTH_PORT`, `WEBHOOK_CERT_PATH` and
    /// `WEBHOOK_KEY_PATH`, falling back to the defaults.
    pub fn from_env() -> std::result::Result<Self, WebhookError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WebhookConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, WebhookError> {
        let defaults = Self::default();
        let port = |key: &str, default: u16| match lookup(key) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| WebhookError::Config(format!("{}={:?}: {}", key, raw, e))),
            None => Ok(default),
        };

        Ok(Self {
            port: port("WEBHOOK_PORT", defaults.port)?,
            health_port: port("HEALTH_PORT", defaults.health_port)?,
            cert_path: lookup("WEBHOOK_CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_path),
            key_path: lookup("WEBHOOK_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_path),
        })
    }

    /// Whether both TLS files are present on disk.
    pub fn certificates_present(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

/// Shared state for webhook handlers
pub struct WebhookState<S> {
    ops: OpsRequestValidator<S>,
    schemas: SchemaValidator<S>,
    health: Arc<HealthState>,
}

impl<S: ObjectStore> WebhookState<S> {
    /// Build both validators over one store; their log events nest under `span`.
    pub fn new(store: Arc<S>, health: Arc<HealthState>, span: Span) -> Self {
        Self {
            ops: OpsRequestValidator::new(store.clone(), span.clone()),
            schemas: SchemaValidator::new(store, span),
            health,
        }
    }
}

type ReviewResponse = (StatusCode, Json<AdmissionReview<DynamicObject>>);

/// Create the webhook router
pub fn create_webhook_router<S: ObjectStore + 'static>(state: Arc<WebhookState<S>>) -> Router {
    Router::new()
        .route("/validate/opsrequests", post(validate_ops_request::<S>))
        .route("/validate/schemas", post(validate_schema::<S>))
        .with_state(state)
}

async fn validate_ops_request<S: ObjectStore + 'static>(
    State(state): State<Arc<WebhookState<S>>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> ReviewResponse {
    let request = match extract(review) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = admit_ops_request(&state.ops, &request).await;
    respond(&state.health, &request, result, started)
}

async fn validate_schema<S: ObjectStore + 'static>(
    State(state): State<Arc<WebhookState<S>>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> ReviewResponse {
    let request = match extract(review) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let started = Instant::now();
    let result = admit_schema(&state.schemas, &request).await;
    respond(&state.health, &request, result, started)
}

fn extract(
    review: AdmissionReview<DynamicObject>,
) -> std::result::Result<AdmissionRequest<DynamicObject>, ReviewResponse> {
    review.try_into().map_err(|e| {
        error!(error = %e, "Failed to extract admission request");
        (
            StatusCode::BAD_REQUEST,
            Json(AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review()),
        )
    })
}

async fn admit_ops_request<S: ObjectStore>(
    validator: &OpsRequestValidator<S>,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<Warnings> {
    let engine = DatabaseEngine::from_ops_kind(&request.kind.kind)?;
    match request.operation {
        Operation::Create => {
            let new = decode(request, request.object.as_ref())?;
            validator.validate_create(engine, &new).await
        }
        Operation::Update => {
            let old = decode(request, request.old_object.as_ref())?;
            let new = decode(request, request.object.as_ref())?;
            validator.validate_update(engine, &old, &new).await
        }
        Operation::Delete => {
            let old = decode(request, request.old_object.as_ref())?;
            validator.validate_delete(engine, &old).await
        }
        Operation::Connect => Ok(Warnings::new()),
    }
}

async fn admit_schema<S: ObjectStore>(
    validator: &SchemaValidator<S>,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<Warnings> {
    let kind: SchemaKind = request.kind.kind.parse()?;
    match request.operation {
        Operation::Create => {
            let new = decode(request, request.object.as_ref())?;
            validator.validate_create(kind, &new).await
        }
        Operation::Update => {
            let old = decode(request, request.old_object.as_ref())?;
            let new = decode(request, request.object.as_ref())?;
            validator.validate_update(kind, &old, &new).await
        }
        Operation::Delete => {
            let old = decode(request, request.old_object.as_ref())?;
            validator.validate_delete(kind, &old).await
        }
        Operation::Connect => Ok(Warnings::new()),
    }
}

/// Decode the review object into a typed model. The request namespace is
/// authoritative when the object itself carries none.
fn decode<T: DeserializeOwned>(
    request: &AdmissionRequest<DynamicObject>,
    object: Option<&DynamicObject>,
) -> Result<T> {
    let mut object = object.cloned().ok_or(Error::MissingObject)?;
    if object.metadata.namespace.is_none() {
        object.metadata.namespace = request.namespace.clone();
    }
    if object.metadata.name.is_none() && !request.name.is_empty() {
        object.metadata.name = Some(request.name.clone());
    }
    Ok(serde_json::from_value(serde_json::to_value(&object)?)?)
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

fn respond(
    health: &HealthState,
    request: &AdmissionRequest<DynamicObject>,
    result: Result<Warnings>,
    started: Instant,
) -> ReviewResponse {
    let uid = &request.uid;
    let (response, outcome) = match result {
        Ok(warnings) => {
            info!(uid = %uid, kind = %request.kind.kind, name = %request.name, "Admission request allowed");
            let mut response = AdmissionResponse::from(request);
            if !warnings.is_empty() {
                response.warnings = Some(warnings);
            }
            (response, AdmissionResult::Allowed)
        }
        Err(err) => {
            let outcome = if err.is_retryable() || matches!(err, Error::Kube(_)) {
                error!(uid = %uid, error = %err, "Admission request failed");
                AdmissionResult::Error
            } else {
                warn!(uid = %uid, kind = %request.kind.kind, name = %request.name, error = %err, "Admission request denied");
                AdmissionResult::Denied
            };
            (rejection(request, &err), outcome)
        }
    };

    health.metrics.record_admission(
        &request.kind.kind,
        operation_label(&request.operation),
        outcome,
        started.elapsed().as_secs_f64(),
    );
    debug!(uid = %uid, allowed = response.allowed, "Admission response built");

    (StatusCode::OK, Json(response.into_review()))
}

/// Map a crate error onto the `Status` of a denied admission response.
fn rejection(request: &AdmissionRequest<DynamicObject>, err: &Error) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(err.to_string());
    response.result.status = Some(StatusSummary::Failure);

    let (code, reason) = match err {
        Error::Invalid(invalid) => {
            response.result.details = Some(invalid.status_details());
            (422, "Invalid")
        }
        Error::UnknownKind(_) => (400, "UnsupportedKind"),
        Error::MissingObject | Error::Serialization(_) => (400, "BadRequest"),
        Error::Store(_) | Error::Kube(_) => (500, "InternalError"),
    };
    response.result.code = code;
    response.result.reason = reason.to_string();
    response
}

/// Run the webhook server with TLS on `0.0.0.0:<config.port>`.
///
/// Marks the health state ready once the certificate is loaded.
pub async fn run_webhook_server<S: ObjectStore + 'static>(
    state: Arc<WebhookState<S>>,
    config: &WebhookConfig,
) -> std::result::Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;

    let health = state.health.clone();
    let app = create_webhook_router(state);

    let tls = RustlsConfig::from_pem_file(config.cert_path.clone(), config.key_path.clone())
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Webhook server listening with TLS");
    health.set_ready(true).await;

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
