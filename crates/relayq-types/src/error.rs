//! Error types for RelayQ
//!
//! Every broker operation fails with one of a closed set of error kinds.
//! Each kind carries a stable machine-readable code (see [`Error::code`])
//! that the HTTP layer translates to a status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Name of the invalid field
    pub field: String,
    /// Why the field is invalid
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for RelayQ operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Queue not found
    #[error("Queue '{0}' not found")]
    QueueNotFound(String),

    /// Queue already exists
    #[error("Queue '{0}' already exists")]
    QueueAlreadyExists(String),

    /// System queues may never be deleted
    #[error("Queue '{0}' is a system queue and cannot be deleted")]
    QueueNonDeletable(String),

    /// Exchange not found
    #[error("Exchange '{0}' not found")]
    ExchangeNotFound(String),

    /// Exchange already exists
    #[error("Exchange '{0}' already exists")]
    ExchangeAlreadyExists(String),

    /// Binding not found
    #[error("Binding '{0}' not found")]
    BindingNotFound(Uuid),

    /// A binding on this exchange already targets the queue
    #[error("Binding to Queue '{0}' already exists")]
    BindingAlreadyExists(String),

    /// No in-flight message with this id
    #[error("Message '{0}' not found")]
    MessageNotFound(Uuid),

    /// Malformed path or query parameter
    #[error("Invalid parameter '{param}': {message}")]
    ParamInvalid { param: String, message: String },

    /// Structurally invalid request body, one entry per invalid field
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
}

impl Error {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::QueueNotFound(_) => "QUEUE_NOT_FOUND",
            Error::QueueAlreadyExists(_) => "QUEUE_ALREADY_EXISTS",
            Error::QueueNonDeletable(_) => "QUEUE_NON_DELETABLE",
            Error::ExchangeNotFound(_) => "EXCHANGE_NOT_FOUND",
            Error::ExchangeAlreadyExists(_) => "EXCHANGE_ALREADY_EXISTS",
            Error::BindingNotFound(_) => "BINDING_NOT_FOUND",
            Error::BindingAlreadyExists(_) => "BINDING_ALREADY_EXISTS",
            Error::MessageNotFound(_) => "MESSAGE_NOT_FOUND",
            Error::ParamInvalid { .. } => "PARAM_INVALID",
            Error::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Field-level failures, non-empty only for `VALIDATION_ERROR`
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// Result type alias for RelayQ operations
pub type Result<T> = std::result::Result<T, Error>;
