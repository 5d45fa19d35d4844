//! # Validation Module
//!
//! Field-level checks shared by the entry, delivery and payment paths.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command decoding (workbench)                                 │
//! │  └── Type validation (serde deserialization)                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core rules                                                   │
//! │  ├── THIS MODULE: required fields, lengths, ranges                     │
//! │  └── entry / delivery / totals: quantity and payment rules             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (entry code, document number)                              │
//! │  └── CHECK constraints on stored statuses                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text field accepted (names, methods, notes).
pub const MAX_TEXT_LEN: usize = 500;

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Checks an inclusive date range; either bound may be open.
pub fn validate_date_range(
    field: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: format!("start {} is after end {}", start, end),
            });
        }
    }
    Ok(())
}

/// Whether `date` falls in the inclusive range.
pub fn in_date_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

/// A percentage between 0 and 100 inclusive.
///
/// A positive value must still be representable in basis points, so
/// anything below 0.005 (which rounds to 0 bps) is rejected too.
pub fn validate_percent(field: &str, pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    if pct > 0.0 && (pct * 100.0).round() < 1.0 {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be at least 0.01 when set".to_string(),
        });
    }
    Ok(())
}

/// Tax rate entered as a percentage.
pub fn validate_tax_percent(pct: f64) -> ValidationResult<()> {
    validate_percent("taxRate", pct)
}

// =============================================================================
// Unit Tests
// =============================================================================
