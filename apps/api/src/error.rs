//! # API Error Type
//!
//! Unified error body for every handler.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler → Result<T, ApiError>                                          │
//! │                                                                         │
//! │  BillingError::Validation ──────► 422 VALIDATION_ERROR (+ details)     │
//! │  BillingError::InsufficientStock ► 409 INSUFFICIENT_STOCK              │
//! │  BillingError::NotFound ────────► 404 NOT_FOUND                        │
//! │  BillingError::AlreadyCancelled ► 409 ALREADY_CANCELLED                │
//! │  BillingError::Timeout ─────────► 503 TIMEOUT                          │
//! │  DbError (anything else) ───────► 500 DATABASE_ERROR (logged, generic) │
//! │  missing identity ──────────────► 401 UNAUTHORIZED                     │
//! │  role lacks capability ─────────► 403 FORBIDDEN                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The frontend receives:
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock in batch LOT-7 (b-1): available 2, requested 5"
//! }
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pharmos_core::FieldError;
use pharmos_db::{BillingError, DbError, LedgerError};

/// Error body returned by every failing request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field problems, for validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (422)
    ValidationError,

    /// Not enough stock in a batch (409)
    InsufficientStock,

    /// Resource not found (404)
    NotFound,

    /// Bill is already cancelled (409)
    AlreadyCancelled,

    /// No usable identity on the request (401)
    Unauthorized,

    /// Identity lacks the capability (403)
    Forbidden,

    /// Operation exceeded its deadline and was rolled back (503)
    Timeout,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InsufficientStock | ErrorCode::AlreadyCancelled => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error carrying field details.
    pub fn validation(details: Vec<FieldError>) -> Self {
        let message = match details.as_slice() {
            [single] => format!("{}: {}", single.field, single.message),
            many => format!("{} fields are invalid", many.len()),
        };
        ApiError {
            code: ErrorCode::ValidationError,
            message,
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        BillingError::from(err).into()
    }
}

/// Converts coordinator outcomes to API errors.
impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(details) => ApiError::validation(details),
            e @ BillingError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            BillingError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            e @ BillingError::AlreadyCancelled(_) => {
                ApiError::new(ErrorCode::AlreadyCancelled, e.to_string())
            }
            e @ BillingError::Timeout(_) => ApiError::new(ErrorCode::Timeout, e.to_string()),
            BillingError::Persistence(db) => db.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorCode::InsufficientStock.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::AlreadyCancelled.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::Timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_billing_error_conversion() {
        let err: ApiError = BillingError::InsufficientStock {
            batch_id: "b-1".to_string(),
            lot_number: "LOT-7".to_string(),
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("available 2"));

        let err: ApiError = BillingError::Validation(vec![
            FieldError::new("customerName", "customerName is required"),
            FieldError::new("items", "at least one item is required"),
        ])
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.details.len(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Bill", "b-9")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Bill not found: b-9");
        assert!(json.get("details").is_none());
    }
}
