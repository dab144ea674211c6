//! Error types for the admission layer.
//!
//! Defines the crate error with classification for retry behavior.

use thiserror::Error;

use crate::validation::{InvalidError, StoreError};

/// Error type for admission operations
#[derive(Error, Debug)]
pub enum Error {
    /// The object failed validation; carries the field errors
    #[error("{0}")]
    Invalid(Box<InvalidError>),

    /// A point read against the object store failed
    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The admission request names a kind this webhook does not handle
    #[error("unsupported kind: {0}")]
    UnknownKind(String),

    /// The admission request carries no object to validate
    #[error("missing object in admission request")]
    MissingObject,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Store(StoreError::NotFound { .. }))
            || matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if the caller may retry the admission call
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_retryable(),
            Error::Kube(e) => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Invalid(_)
            | Error::UnknownKind(_)
            | Error::MissingObject
            | Error::Serialization(_) => false,
        }
    }

    /// The validation failure, if this is one
    pub fn as_invalid(&self) -> Option<&InvalidError> {
        match self {
            Error::Invalid(invalid) => Some(invalid),
            _ => None,
        }
    }
}

impl From<InvalidError> for Error {
    fn from(invalid: InvalidError) -> Self {
        Error::Invalid(Box::new(invalid))
    }
}

/// Result type alias for admission operations
pub type Result<T> = std::result::Result<T, Error>;
