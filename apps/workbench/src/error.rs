//! # API Error Type
//!
//! Unified error type for workbench commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Workbench                          │
//! │                                                                         │
//! │  {"command":{"type":"GenerateInvoice", ...}}                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  dispatch()  →  Result<Response, ApiError>                       │  │
//! │  │         │                                                        │  │
//! │  │  DbError::ConcurrentModification ────────────► CONFLICT         │  │
//! │  │  DbError::Domain(CoreError::MixedClients) ───► MIXED_CLIENTS    │  │
//! │  │  DbError::QueryFailed(..) ── logged ─────────► DATABASE_ERROR   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  {"ok":false,"error":{"code":"CONFLICT","message":"..."}}               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use atelier_core::CoreError;
use atelier_db::DbError;

/// Error returned from workbench commands.
///
/// ```json
/// {
///   "code": "NO_BILLABLE_ITEMS",
///   "message": "No delivered items with a valid price found in the selected entries"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced record does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Entries of one document belong to different clients
    MixedClients,

    /// Nothing delivered and priced in the selection
    NoBillableItems,

    /// Lost a race: entry already invoiced or changed since it was read.
    /// Refresh and retry.
    Conflict,

    /// Role does not allow the action
    Forbidden,

    /// A reconciliation rule refused the operation
    BusinessLogic,

    /// Database operation failed
    DatabaseError,

    /// Internal error
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
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                ApiError::new(ErrorCode::Conflict, format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            err @ DbError::ConcurrentModification { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            DbError::Domain(err) => err.into(),
            DbError::Serialization(e) => {
                tracing::error!("Stored JSON could not be read: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts rule violations to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::MixedClients { .. } => ErrorCode::MixedClients,
            CoreError::NoBillableItems => ErrorCode::NoBillableItems,
            CoreError::ConcurrentInvoicingConflict { .. } => ErrorCode::Conflict,
            CoreError::Forbidden { .. } => ErrorCode::Forbidden,
            CoreError::Validation(_) | CoreError::Overflow { .. } => ErrorCode::ValidationError,
            CoreError::EntryLocked { .. }
            | CoreError::OverDelivery { .. }
            | CoreError::InvalidStatusTransition { .. }
            | CoreError::InvalidPaymentAmount { .. } => ErrorCode::BusinessLogic,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_codes() {
        let err: ApiError = DbError::Domain(CoreError::MixedClients {
            expected: "c1".to_string(),
            found: "c2".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::MixedClients);

        let err: ApiError = CoreError::ConcurrentInvoicingConflict {
            entry_id: "e1".to_string(),
            invoice_id: "d1".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "Entry e1 is already linked to invoice d1");
    }

    #[test]
    fn test_overflow_is_a_validation_error() {
        let err: ApiError = DbError::Domain(CoreError::Overflow {
            context: "subtotal".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Value out of range while computing subtotal");
    }

    #[test]
    fn test_stale_write_is_conflict() {
        let err: ApiError = DbError::concurrent("Entry", "e1").into();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_query_failure_hides_detail() {
        let err: ApiError = DbError::QueryFailed("no such column: foo".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::not_found("Entry", "e9");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Entry not found: e9");
        assert_eq!(err.to_string(), "[NotFound] Entry not found: e9");
    }
}
