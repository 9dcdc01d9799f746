//! # API Error Type
//!
//! The one error type pages return, shown to the user as a blocking alert.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockroom                              │
//! │                                                                         │
//! │  Page function                                                          │
//! │  Result<T, ApiError>                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Backend error? ─── BackendError::Http { 500, .. } ──┐                 │
//! │         │                                            │ logged in full  │
//! │         ▼                                            ▼                 │
//! │  Rule violation? ─── CoreError::InsufficientStock ── ApiError ────►    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Success ───────────────────────────────────────────────────────►      │
//! │                                                                         │
//! │  CLI: "error: [InsufficientStock] Insufficient stock for Flour: ..."   │
//! │       printed to stderr, exit status 1                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is surfaced exactly once; nothing retries.

use serde::Serialize;
use stockroom_backend::BackendError;
use stockroom_core::{CoreError, ValidationError};

use crate::state::ConfigError;
use crate::storage::StoreError;

/// Error returned from page functions.
///
/// ## Serialization
/// ```json
/// {
///   "code": "TRANSFER_FAILED",
///   "message": "Transfer 9c1e... failed (outbound movement reversed): ..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// No session or session expired (401)
    Unauthorized,

    /// Refused by a permission check or row-level security (403)
    Forbidden,

    /// The backend answered with an error
    BackendError,

    /// The backend could not be reached
    Network,

    /// Business rule violated (422)
    BusinessLogic,

    /// Insufficient stock
    InsufficientStock,

    /// Transfer could not be completed
    TransferFailed,

    /// Bad or missing configuration
    Config,

    /// Local store could not be read or written
    Storage,

    /// Internal error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn unauthorized() -> Self {
        ApiError::new(ErrorCode::Unauthorized, "Please sign in first")
    }
}

/// Converts backend errors to API errors.
impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            BackendError::Unauthorized => ApiError::new(
                ErrorCode::Unauthorized,
                "Your session has expired, please sign in again",
            ),
            BackendError::InvalidCredentials => {
                ApiError::new(ErrorCode::Unauthorized, "Invalid e-mail or password")
            }
            BackendError::Forbidden(message) => ApiError::new(ErrorCode::Forbidden, message),
            BackendError::Http { status, message } if status == 409 => {
                tracing::error!(status, %message, "Backend conflict");
                ApiError::new(ErrorCode::ValidationError, "A record with this id already exists")
            }
            BackendError::Http { status, message } if (400..500).contains(&status) => {
                tracing::error!(status, %message, "Backend rejected request");
                ApiError::new(ErrorCode::BackendError, format!("Request rejected: {message}"))
            }
            BackendError::Http { status, message } => {
                // log the details, show a generic message
                tracing::error!(status, %message, "Backend request failed");
                ApiError::new(ErrorCode::BackendError, "The server could not complete the request")
            }
            BackendError::Network(e) => {
                tracing::error!("Network error: {}", e);
                ApiError::new(ErrorCode::Network, "Cannot reach the server")
            }
            BackendError::Decode(e) => {
                tracing::error!("Unexpected backend response: {}", e);
                ApiError::new(ErrorCode::BackendError, "Unexpected response from the server")
            }
            BackendError::Rpc { name, message } => {
                tracing::error!(rpc = %name, %message, "RPC failed");
                ApiError::new(ErrorCode::BackendError, format!("Server function {name} failed"))
            }
            err @ BackendError::TransferFailed { .. } => {
                tracing::error!(error = %err, "Transfer failed");
                ApiError::new(ErrorCode::TransferFailed, err.to_string())
            }
            BackendError::Core(e) => e.into(),
            BackendError::Config(e) => ApiError::new(ErrorCode::Config, e),
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            err @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            err @ (CoreError::InvalidTransfer(_)
            | CoreError::EmptyOrder
            | CoreError::OrderTooLarge { .. }
            | CoreError::InvalidStatusChange { .. }) => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Local storage error: {}", err);
        ApiError::new(ErrorCode::Storage, "Could not save local data")
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::Config, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
