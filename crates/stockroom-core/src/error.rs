//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Order / stock rule violations                  │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  stockroom-backend errors (separate crate)                             │
//! │  └── BackendError     - HTTP, auth, decode failures                    │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── ApiError         - What the user sees in the alert                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BackendError → ApiError → Alert   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations detected on the client before any write.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced catalog / inventory row is not in the loaded lists.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Not enough stock on hand for an outbound movement.
    ///
    /// ## User Workflow
    /// ```text
    /// Transfer 5 kg from "Flour (store)"
    ///      │
    ///      ▼
    /// on_hand = 3 kg
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Flour (store)", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Transfer parameters do not describe a valid movement.
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Order has no lines.
    #[error("Order must have at least one line")]
    EmptyOrder,

    /// Order has exceeded the maximum number of lines.
    #[error("Order cannot have more than {max} lines")]
    OrderTooLarge { max: usize },

    /// Requested order status change is not allowed from the current status.
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusChange {
        order_id: String,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Form validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            item: "Flour".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_milli(5_500),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Flour: available 3, requested 5.5"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: name is required");
    }
}
