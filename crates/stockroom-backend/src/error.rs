//! # Backend Error Types
//!
//! Error types for calls to the hosted backend.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  reqwest::Error / HTTP status / serde_json::Error                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BackendError (this module) ← Adds context and categorization          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in app) ← code + message                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Blocking alert shown to the user                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stockroom_core::{CoreError, ValidationError};

/// Backend operation errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Row not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// No session, or the session token was rejected (HTTP 401).
    #[error("Not signed in or session expired")]
    Unauthorized,

    /// Wrong e-mail or password.
    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    /// Row-level security or a permission RPC refused the operation.
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// The backend answered with an error status.
    #[error("Backend error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// A response body did not match the expected row shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A remote procedure call failed.
    #[error("RPC {name} failed: {message}")]
    Rpc { name: String, message: String },

    /// Both inserts of a transfer could not be completed.
    ///
    /// `compensated` tells whether the reversal movement was recorded; when it
    /// was not, the source item is short by the outbound quantity.
    #[error("Transfer {transfer_id} failed ({}): {cause}", compensation_note(.compensated))]
    TransferFailed {
        transfer_id: String,
        compensated: bool,
        cause: String,
    },

    /// Client-side rule violation raised while preparing a write.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration (URL, key).
    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

fn compensation_note(compensated: &bool) -> &'static str {
    if *compensated {
        "outbound movement reversed"
    } else {
        "REVERSAL ALSO FAILED"
    }
}

impl BackendError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BackendError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<ValidationError> for BackendError {
    fn from(err: ValidationError) -> Self {
        BackendError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return BackendError::Decode(err.to_string());
        }
        if err.is_timeout() {
            return BackendError::Network("request timed out".to_string());
        }
        if err.is_connect() {
            return BackendError::Network("cannot reach backend".to_string());
        }
        BackendError::Network(err.to_string())
    }
}

impl From<url::ParseError> for BackendError {
    fn from(err: url::ParseError) -> Self {
        BackendError::Config(err.to_string())
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_failed_message() {
        let err = BackendError::TransferFailed {
            transfer_id: "t1".to_string(),
            compensated: true,
            cause: "Network error: cannot reach backend".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transfer t1 failed (outbound movement reversed): Network error: cannot reach backend"
        );
    }

    #[test]
    fn test_core_error_passes_through() {
        let err: BackendError = CoreError::EmptyOrder.into();
        assert_eq!(err.to_string(), "Order must have at least one line");
    }
}
