//! # Validation Module
//!
//! Form validation for Stockroom pages.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Page form (this module)                                       │
//! │  ├── Required fields, lengths, number ranges                           │
//! │  └── Immediate feedback, no request sent                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Hosted backend                                               │
//! │  ├── NOT NULL / FK / UNIQUE constraints                                │
//! │  └── Row-level security (who may write what)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{validate_name, validate_order_quantity};
//!
//! assert!(validate_name("name", "Acme Bakery").is_ok());
//! assert!(validate_order_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted name (clients, products, variants, inventory items).
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted free-text note.
pub const MAX_NOTE_LEN: usize = 2_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name and returns it trimmed.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Normalizes an optional text input: blank becomes `None`.
pub fn validate_optional_text(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > MAX_NOTE_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LEN,
        }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Validates an optional e-mail address.
///
/// ## Rules
/// - Blank is allowed (clients without e-mail)
/// - Otherwise exactly one `@`, non-empty local part, a dot in the domain
pub fn validate_email(value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }

    match domain.split_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(Some(email.to_string())),
        _ => Err(invalid()),
    }
}

/// Validates a unit label ("kg", "box", "piece").
pub fn validate_unit(unit: &str) -> ValidationResult<String> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Err(ValidationError::Required {
            field: "unit".to_string(),
        });
    }
    if unit.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "unit".to_string(),
            max: 32,
        });
    }
    Ok(unit.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents. Zero is allowed (samples, gifts).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates an order line quantity (whole units, `1..=MAX_LINE_QUANTITY`).
pub fn validate_order_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a movement quantity (strictly positive).
pub fn validate_movement_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a minimum stock threshold (zero or more).
pub fn validate_min_quantity(qty: Quantity) -> ValidationResult<()> {
    if qty.milli() < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minimum quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (route parameters, CLI arguments).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Acme  ").unwrap(), "Acme");
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("notes", None).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" call first ")).unwrap(),
            Some("call first".to_string())
        );
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(None).unwrap(), None);
        assert_eq!(validate_email(Some("")).unwrap(), None);
        assert!(validate_email(Some("ana@shop.com")).unwrap().is_some());
        assert!(validate_email(Some("ana@shop")).is_err());
        assert!(validate_email(Some("@shop.com")).is_err());
        assert!(validate_email(Some("ana@@shop.com")).is_err());
        assert!(validate_email(Some("ana maria@shop.com")).is_err());
    }

    #[test]
    fn test_validate_order_quantity() {
        assert!(validate_order_quantity(1).is_ok());
        assert!(validate_order_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_order_quantity(0).is_err());
        assert!(validate_order_quantity(-3).is_err());
        assert!(validate_order_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_quantities() {
        assert!(validate_movement_quantity(Quantity::from_milli(1)).is_ok());
        assert!(validate_movement_quantity(Quantity::zero()).is_err());
        assert!(validate_min_quantity(Quantity::zero()).is_ok());
        assert!(validate_min_quantity(Quantity::from_milli(-1)).is_err());
    }

    #[test]
    fn test_validate_price_and_unit() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert_eq!(validate_unit(" kg ").unwrap(), "kg");
        assert!(validate_unit("").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
