//! Field errors and the structured "invalid" rejection.
//!
//! Mirrors the apimachinery field error shape: a path, an optional rejected
//! value and a detail message. Every error also carries the category of the
//! admission failure so hosts can tell referential problems from shape ones.

use std::fmt;

use kube::core::response::{StatusCause, StatusDetails};
use serde_json::Value;

/// Machine-readable field error type (apimachinery `field.ErrorType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Required,
    Invalid,
    NotFound,
    NotSupported,
    Forbidden,
    Duplicate,
}

impl ErrorType {
    /// Reason string used in `StatusCause.reason`.
    pub fn reason(&self) -> &'static str {
        match self {
            ErrorType::Required => "FieldValueRequired",
            ErrorType::Invalid => "FieldValueInvalid",
            ErrorType::NotFound => "FieldValueNotFound",
            ErrorType::NotSupported => "FieldValueNotSupported",
            ErrorType::Forbidden => "FieldValueForbidden",
            ErrorType::Duplicate => "FieldValueDuplicate",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ErrorType::Required => "Required value",
            ErrorType::Invalid => "Invalid value",
            ErrorType::NotFound => "Not found",
            ErrorType::NotSupported => "Unsupported value",
            ErrorType::Forbidden => "Forbidden",
            ErrorType::Duplicate => "Duplicate value",
        }
    }
}

/// Admission failure taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A referenced object does not exist.
    Referential,
    /// Missing sub-spec, conflicting fields or an out-of-bounds value.
    Structural,
    /// An update touches a field frozen by the current lifecycle state.
    Immutability,
    /// The declared operation type is not legal for the engine.
    UnsupportedType,
}

/// One rejected field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub error_type: ErrorType,
    pub category: ErrorCategory,
    pub field: String,
    pub bad_value: Option<Value>,
    pub detail: String,
}

impl FieldError {
    pub fn required(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Required,
            category: ErrorCategory::Structural,
            field: field.into(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn invalid(
        field: impl Into<String>,
        value: impl Into<Value>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: ErrorType::Invalid,
            category: ErrorCategory::Structural,
            field: field.into(),
            bad_value: Some(value.into()),
            detail: detail.into(),
        }
    }

    pub fn forbidden(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Forbidden,
            category: ErrorCategory::Structural,
            field: field.into(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            error_type: ErrorType::Duplicate,
            category: ErrorCategory::Structural,
            field: field.into(),
            bad_value: Some(value.into()),
            detail: String::new(),
        }
    }

    /// A referenced object is missing.
    pub fn not_found(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            error_type: ErrorType::NotFound,
            category: ErrorCategory::Referential,
            field: field.into(),
            bad_value: Some(value.into()),
            detail: String::new(),
        }
    }

    /// A value outside a closed set. Used on `spec.type` for unsupported
    /// operation kinds and on shape field names.
    pub fn not_supported(field: impl Into<String>, value: impl Into<Value>, valid: &[&str]) -> Self {
        let quoted: Vec<String> = valid.iter().map(|v| format!("\"{}\"", v)).collect();
        Self {
            error_type: ErrorType::NotSupported,
            category: ErrorCategory::Structural,
            field: field.into(),
            bad_value: Some(value.into()),
            detail: format!("supported values: {}", quoted.join(", ")),
        }
    }

    /// An update touched a frozen field.
    pub fn immutable(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Invalid,
            category: ErrorCategory::Immutability,
            field: field.into(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Message without the field path, as put into `StatusCause.message`.
    pub fn error_body(&self) -> String {
        let mut body = self.error_type.describe().to_string();
        if let Some(value) = &self.bad_value {
            match value {
                Value::String(s) => body.push_str(&format!(": \"{}\"", s)),
                Value::Null => {}
                other => body.push_str(&format!(": {}", other)),
            }
        }
        if !self.detail.is_empty() {
            body.push_str(": ");
            body.push_str(&self.detail);
        }
        body
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_body())
    }
}

/// Field errors collected by one validation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }

    /// Whether any error falls into the given category.
    pub fn has_category(&self, category: ErrorCategory) -> bool {
        self.0.iter().any(|e| e.category == category)
    }
}

impl From<Vec<FieldError>> for ErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The single structured rejection returned for a failed validation.
///
/// Renders as `<Kind>.<group> "<name>" is invalid: [<errors>]` and converts
/// into the `StatusDetails` of a 422 admission response.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidError {
    pub group: String,
    pub kind: String,
    pub name: String,
    pub errors: ErrorList,
}

impl InvalidError {
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        errors: ErrorList,
    ) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            name: name.into(),
            errors,
        }
    }

    /// Status details carrying one cause per field error.
    pub fn status_details(&self) -> StatusDetails {
        StatusDetails {
            name: self.name.clone(),
            group: self.group.clone(),
            kind: self.kind.clone(),
            uid: String::new(),
            causes: self
                .errors
                .iter()
                .map(|e| StatusCause {
                    reason: e.error_type.reason().to_string(),
                    message: e.error_body(),
                    field: e.field.clone(),
                })
                .collect(),
            retry_after_seconds: 0,
        }
    }
}

impl fmt::Display for InvalidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} \"{}\" is invalid: ", self.kind, self.group, self.name)?;
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        if messages.len() == 1 {
            write!(f, "{}", messages.join(""))
        } else {
            write!(f, "[{}]", messages.join(", "))
        }
    }
}

impl std::error::Error for InvalidError {}
