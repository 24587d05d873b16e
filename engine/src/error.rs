//! Error types for the micro engine.

use crate::driver::DriverError;
use crate::response::ApiError;
use thiserror::Error;

/// All possible errors from the record layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Validation errors
    #[error("field required: {0}")]
    FieldRequired(String),

    #[error("unknown field '{field}' for {model}")]
    UnknownField { model: &'static str, field: String },

    #[error("{0}")]
    ObjectSaveRequired(String),

    #[error("invalid tags: {0}")]
    InvalidTags(String),

    #[error("invalid custom fields: {0}")]
    InvalidCustomFields(String),

    #[error("invalid identity: {0}")]
    InvalidId(String),

    // Index declaration errors
    #[error("invalid indexes: {0}")]
    InvalidIndexes(String),

    // Lookup errors
    #[error("{model} has no key field to resolve '{expression}'")]
    KeyFieldUndefined {
        model: &'static str,
        expression: String,
    },

    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    // Hierarchy errors
    #[error("parent already exists")]
    ParentAlreadyExists,

    #[error("parent cycle detected")]
    ParentCycle,

    #[error("parent does not exist")]
    ParentDoesNotExist,

    #[error("child already exists")]
    ChildAlreadyExists,

    #[error("child does not exist")]
    ChildDoesNotExist,

    // Raised by hooks and validators that speak HTTP
    #[error("{0}")]
    Api(#[from] ApiError),

    // Storage errors
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, Error>;
