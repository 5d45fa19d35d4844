//! # Size-Quantity Ledger
//!
//! Arithmetic over "quantity-by-size" maps. Every other component builds
//! on these functions.
//!
//! A size that is not present in the map has quantity 0. That default is
//! applied here, once, so callers never write their own fallbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;

/// Largest quantity accepted for a single size on entry or delivery input.
pub const MAX_SIZE_QUANTITY: i64 = 1_000_000;

/// Units per size label (`"S" -> 10`, `"M" -> 4`).
///
/// Backed by an ordered map so iteration and serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct SizeQuantities(BTreeMap<String, i64>);

impl SizeQuantities {
    pub fn new() -> Self {
        SizeQuantities(BTreeMap::new())
    }

    /// Quantity for a size, 0 when absent.
    #[inline]
    pub fn get(&self, size: &str) -> i64 {
        self.0.get(size).copied().unwrap_or(0)
    }

    /// Sets the quantity for a size, replacing any previous value.
    pub fn set(&mut self, size: impl Into<String>, qty: i64) {
        self.0.insert(size.into(), qty);
    }

    /// Sum of all values, saturating at the `i64` bounds.
    pub fn total_units(&self) -> i64 {
        self.0.values().fold(0, |acc, qty| acc.saturating_add(*qty))
    }

    /// Sum of all values, `None` on overflow.
    pub fn checked_total_units(&self) -> Option<i64> {
        self.0.values().try_fold(0i64, |acc, qty| acc.checked_add(*qty))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(size, qty)| (size.as_str(), *qty))
    }

    pub fn sizes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Adds every size of `other` into `self`.
    pub fn merge(&mut self, other: &SizeQuantities) {
        for (size, qty) in other.iter() {
            let slot = self.0.entry(size.to_string()).or_insert(0);
            *slot = slot.saturating_add(qty);
        }
    }

    /// Copy without the sizes whose value is 0 or less.
    ///
    /// Entry items and delivery items are stored in this form.
    pub fn cleaned(&self) -> SizeQuantities {
        SizeQuantities(
            self.0
                .iter()
                .filter(|(_, qty)| **qty > 0)
                .map(|(size, qty)| (size.clone(), *qty))
                .collect(),
        )
    }

    /// Rejects empty size labels and any value outside
    /// `0..=MAX_SIZE_QUANTITY`. `field` names the map in the error.
    pub fn validate_quantities(&self, field: &str) -> Result<(), ValidationError> {
        for (size, qty) in self.iter() {
            if size.trim().is_empty() {
                return Err(ValidationError::InvalidFormat {
                    field: field.to_string(),
                    reason: "size label must not be empty".to_string(),
                });
            }
            if qty < 0 {
                return Err(ValidationError::Negative {
                    field: format!("{}[{}]", field, size),
                });
            }
            if qty > MAX_SIZE_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: format!("{}[{}]", field, size),
                    min: 0,
                    max: MAX_SIZE_QUANTITY,
                });
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for SizeQuantities {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        SizeQuantities(iter.into_iter().map(|(s, q)| (s.into(), q)).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[(S, i64); N]> for SizeQuantities {
    fn from(pairs: [(S, i64); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// `max(0, ordered - delivered)`.
///
/// Pending is never negative, even when more was delivered than ordered.
#[inline]
pub fn subtract(ordered: i64, delivered: i64) -> i64 {
    ordered.saturating_sub(delivered).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_size_is_zero() {
        let q = SizeQuantities::from([("S", 10)]);
        assert_eq!(q.get("S"), 10);
        assert_eq!(q.get("XL"), 0);
        assert_eq!(SizeQuantities::new().total_units(), 0);
    }

    #[test]
    fn test_total_units() {
        let q = SizeQuantities::from([("S", 10), ("M", 4), ("L", 0)]);
        assert_eq!(q.total_units(), 14);
        assert_eq!(q.checked_total_units(), Some(14));
    }

    #[test]
    fn test_total_units_never_overflows() {
        let q = SizeQuantities::from([("S", i64::MAX), ("M", 1)]);
        assert_eq!(q.checked_total_units(), None);
        assert_eq!(q.total_units(), i64::MAX);

        let mut merged = SizeQuantities::from([("S", i64::MAX)]);
        merged.merge(&SizeQuantities::from([("S", 5)]));
        assert_eq!(merged.get("S"), i64::MAX);

        assert_eq!(subtract(i64::MIN, 1), 0);
    }

    #[test]
    fn test_subtract_clamps_at_zero() {
        assert_eq!(subtract(10, 4), 6);
        assert_eq!(subtract(10, 10), 0);
        assert_eq!(subtract(10, 12), 0);
    }

    #[test]
    fn test_merge() {
        let mut a = SizeQuantities::from([("S", 3), ("M", 1)]);
        a.merge(&SizeQuantities::from([("M", 2), ("L", 5)]));
        assert_eq!(a, SizeQuantities::from([("S", 3), ("M", 3), ("L", 5)]));
    }

    #[test]
    fn test_cleaned_drops_non_positive() {
        let q = SizeQuantities::from([("S", 0), ("M", 2), ("L", -1)]);
        let cleaned = q.cleaned();
        assert_eq!(cleaned, SizeQuantities::from([("M", 2)]));
    }

    #[test]
    fn test_validate_quantities() {
        assert!(SizeQuantities::from([("S", 0), ("M", 3)])
            .validate_quantities("sizeQuantities")
            .is_ok());

        let err = SizeQuantities::from([("S", -1)])
            .validate_quantities("sizeQuantities")
            .unwrap_err();
        assert!(matches!(err, ValidationError::Negative { field } if field == "sizeQuantities[S]"));

        assert!(SizeQuantities::from([(" ", 1)])
            .validate_quantities("sizeQuantities")
            .is_err());
    }

    #[test]
    fn test_validate_quantities_caps_each_size() {
        assert!(SizeQuantities::from([("S", MAX_SIZE_QUANTITY)])
            .validate_quantities("sizeQuantities")
            .is_ok());

        let err = SizeQuantities::from([("M", 1), ("S", i64::MAX)])
            .validate_quantities("sizeQuantities")
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field, max, .. }
                if field == "sizeQuantities[S]" && max == MAX_SIZE_QUANTITY
        ));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let q = SizeQuantities::from([("M", 2), ("S", 1)]);
        assert_eq!(serde_json::to_string(&q).unwrap(), r#"{"M":2,"S":1}"#);
    }
}
