//! # Error Types
//!
//! Domain-specific error types for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atelier-core errors (this file)                                       │
//! │  ├── CoreError        - Reconciliation rule violations                 │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  atelier-db errors (separate crate)                                    │
//! │  └── DbError          - Storage and transaction failures               │
//! │                                                                         │
//! │  workbench errors (app)                                                │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rejection is an explicit error. Quantity anomalies that can come
//! from legitimate manual corrections (delivered above ordered) are clamped
//! by the aggregator instead and never reach this type.

use thiserror::Error;

use crate::types::EntryStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Reconciliation rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist at operation time.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invoice generation over entries that belong to different clients.
    ///
    /// Rejected before any document line is built.
    #[error("Entries for one document must share a client: expected {expected}, found {found}")]
    MixedClients { expected: String, found: String },

    /// Invoice generation produced no line (everything unpriced or undelivered).
    #[error("No delivered items with a valid price found in the selected entries")]
    NoBillableItems,

    /// The entry is already linked to an active document.
    ///
    /// ## When This Occurs
    /// ```text
    /// Request A: claim E1 ──► invoice_id = DOC-A ✓
    /// Request B: claim E1 ──► invoice_id already set
    ///                              │
    ///                              ▼
    ///            ConcurrentInvoicingConflict { entry_id: E1 }
    ///            (caller refreshes and retries)
    /// ```
    #[error("Entry {entry_id} is already linked to invoice {invoice_id}")]
    ConcurrentInvoicingConflict { entry_id: String, invoice_id: String },

    /// The entry is locked by its invoice; deliveries and edits are refused
    /// until the invoice is reversed.
    #[error("Entry {entry_code} is locked by invoice {invoice_id}")]
    EntryLocked { entry_code: String, invoice_id: String },

    /// A delivery asks for more units than remain for an item size.
    #[error("Cannot deliver {requested} of size {size} for item {entry_item_id}: only {remaining} remaining")]
    OverDelivery {
        entry_item_id: String,
        size: String,
        remaining: i64,
        requested: i64,
    },

    /// A status change outside the allowed paths.
    #[error("Entry status cannot change from {from:?} to {to:?}")]
    InvalidStatusTransition { from: EntryStatus, to: EntryStatus },

    /// The acting user lacks the role required for the action.
    #[error("Permission denied: {action} requires an administrator")]
    Forbidden { action: String },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A quantity or money sum does not fit in 64 bits.
    #[error("Value out of range while computing {context}")]
    Overflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
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

/// Input validation errors.
///
/// Used for early validation before any reconciliation logic runs.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
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
