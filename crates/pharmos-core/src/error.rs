//! # Error Types
//!
//! Domain-specific error types for pharmos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharmos-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - A single field rule failed                     │
//! │  └── FieldError       - Serializable field/message pair                │
//! │                                                                         │
//! │  pharmos-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── LedgerError      - Stock ledger outcomes                          │
//! │  └── BillingError     - What the coordinator returns                   │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Not enough stock in a batch to cover a line item.
    ///
    /// ## User Workflow
    /// ```text
    /// Bill line (qty: 5)
    ///      │
    ///      ▼
    /// Batch LOT-001: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { lot_number: "LOT-001", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 2 left in lot LOT-001"
    /// ```
    #[error("Insufficient stock in batch {lot_number} ({batch_id}): available {available}, requested {requested}")]
    InsufficientStock {
        batch_id: String,
        lot_number: String,
        available: i64,
        requested: i64,
    },

    /// A line item references a batch that was not resolved.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single failed field rule.
#[derive(Debug, Clone, Error, PartialEq)]
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

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Field Error
// =============================================================================

/// Field-level problem reported back to the client.
///
/// `field` uses the request's JSON path, e.g. `items[1].quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for FieldError {
    fn from(err: ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            batch_id: "b-1".to_string(),
            lot_number: "LOT-001".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock in batch LOT-001 (b-1): available 2, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customerName".to_string(),
        };
        assert_eq!(err.to_string(), "customerName is required");

        let err = ValidationError::OutOfRange {
            field: "items[0].quantity".to_string(),
            min: 1,
            max: 999,
        };
        assert_eq!(err.to_string(), "items[0].quantity must be between 1 and 999");
    }

    #[test]
    fn test_field_error_from_validation() {
        let fe: FieldError = ValidationError::MustBePositive {
            field: "items[2].quantity".to_string(),
        }
        .into();
        assert_eq!(fe.field, "items[2].quantity");
        assert_eq!(fe.message, "items[2].quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "batchId".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
