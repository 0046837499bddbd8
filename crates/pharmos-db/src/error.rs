//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError / BillingError ← Business outcome of the call             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (apps/api) ← Serialized for the frontend                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Bill number collision
    /// - Duplicate lot number for a product
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Batch referencing a non-existent product
    /// - Bill item referencing a non-existent bill
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. `quantity >= 0`).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Wraps a failed BEGIN/COMMIT.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }
}

/// Maps sqlx failures onto [`DbError`].
///
/// SQLite reports constraint failures only through the message text:
/// `UNIQUE constraint failed: bills.bill_number`, `FOREIGN KEY constraint
/// failed`, `CHECK constraint failed: quantity >= 0`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => constraint_error(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

fn constraint_error(msg: &str) -> DbError {
    if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
        return DbError::UniqueViolation {
            field: columns.to_string(),
            value: "unknown".to_string(),
        };
    }
    if msg.starts_with("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: msg.to_string(),
        };
    }
    if msg.starts_with("CHECK constraint failed") {
        return DbError::CheckViolation {
            message: msg.to_string(),
        };
    }
    DbError::QueryFailed(msg.to_string())
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// Outcome of a stock ledger mutation that did not apply.
///
/// A failed deduct never changes the batch: the update is a single
/// conditional statement, so there is nothing to undo.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Batch not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock in batch {lot_number} ({batch_id}): available {available}, requested {requested}")]
    InsufficientStock {
        batch_id: String,
        lot_number: String,
        available: i64,
        requested: i64,
    },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Db(err.into())
    }
}

/// Result type for stock ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_messages() {
        assert!(matches!(
            constraint_error("UNIQUE constraint failed: bills.bill_number"),
            DbError::UniqueViolation { ref field, .. } if field == "bills.bill_number"
        ));
        assert!(matches!(
            constraint_error("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            constraint_error("CHECK constraint failed: quantity >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(constraint_error("disk I/O error"), DbError::QueryFailed(_)));
    }

    #[test]
    fn test_ledger_error_wraps_db() {
        let err: LedgerError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, LedgerError::Db(DbError::PoolExhausted)));
    }
}
