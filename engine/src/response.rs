//! API errors and their JSON rendering.
//!
//! [`ApiError`] is the error family an HTTP layer is expected to catch and
//! render: a message, a status code and an optional payload. Any other error
//! is reported as a generic 400 carrying its display form.

use crate::Error;
use serde_json::{json, Value};
use std::fmt;

/// Kind of [`ApiError`], fixing its default status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Generic client error
    Api,
    /// Referenced entity absent
    NotFound,
    /// State conflict, e.g. a duplicate key
    Conflict,
    /// Missing or invalid credentials
    Authentication,
}

impl ApiErrorKind {
    pub fn default_status(self) -> u16 {
        match self {
            ApiErrorKind::Api => 400,
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::Conflict => 409,
            ApiErrorKind::Authentication => 403,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Api => write!(f, "ApiError"),
            ApiErrorKind::NotFound => write!(f, "NotFound"),
            ApiErrorKind::Conflict => write!(f, "Conflict"),
            ApiErrorKind::Authentication => write!(f, "AuthenticationError"),
        }
    }
}

/// An error meant to be shown to an API client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}, status_code={status_code}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status_code: u16,
    pub payload: Option<Value>,
}

impl ApiError {
    fn of(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: kind.default_status(),
            payload: None,
        }
    }

    /// Generic client error (400).
    pub fn new(message: impl Into<String>) -> Self {
        Self::of(ApiErrorKind::Api, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::of(ApiErrorKind::NotFound, message)
    }

    /// 409.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::of(ApiErrorKind::Conflict, message)
    }

    /// 403.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::of(ApiErrorKind::Authentication, message)
    }

    /// Override the status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Attach structured data.
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// `{"error": message}`, plus `"data"` when the payload is non-empty.
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "error": self.message });
        if let Some(payload) = self.payload.as_ref().filter(|p| is_truthy(p)) {
            body["data"] = payload.clone();
        }
        body
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Status code and JSON body for a record-layer error.
pub fn translate(error: &Error) -> (u16, Value) {
    match error {
        Error::Api(api) => (api.status_code, api.to_json()),
        other => translate_other(other),
    }
}

/// Status code and JSON body for any error outside the [`ApiError`] family.
pub fn translate_other(error: &dyn fmt::Display) -> (u16, Value) {
    (400, json!({ "error": error.to_string() }))
}
