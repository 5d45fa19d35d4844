//! # Delivery Recording
//!
//! The authoritative check for a new delivery. Input above what remains is
//! rejected, never clamped.
//!
//! ```text
//!   DeliveryInput ──► entry locked?            → EntryLocked
//!                 ──► unknown entry item?      → NotFound
//!                 ──► quantity out of range?   → Validation
//!                 ──► drop zero sizes/items; empty → Validation
//!                 ──► above remaining(size)?   → OverDelivery
//!                 ──► Delivery (ready to store)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregate::EntryAggregate;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::SizeQuantities;
use crate::status::after_delivery;
use crate::types::{Delivery, DeliveryItem, Entry, EntryStatus};
use crate::validation::{validate_max_len, validate_required, MAX_TEXT_LEN};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItemInput {
    pub entry_item_id: String,
    pub size_quantities: SizeQuantities,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInput {
    pub entry_id: String,
    /// Defaults to the time of recording.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub who_delivered: String,
    pub items: Vec<DeliveryItemInput>,
}

/// Validates `input` against `entry` and the deliveries already stored
/// for it, producing the delivery items to persist.
pub fn validate_delivery(
    entry: &Entry,
    existing: &[Delivery],
    input: &DeliveryInput,
) -> CoreResult<Vec<DeliveryItem>> {
    if let Some(invoice_id) = &entry.invoice_id {
        return Err(CoreError::EntryLocked {
            entry_code: entry.code.clone(),
            invoice_id: invoice_id.clone(),
        });
    }
    validate_required("whoDelivered", &input.who_delivered)?;
    validate_max_len("whoDelivered", &input.who_delivered, MAX_TEXT_LEN)?;

    let aggregate = EntryAggregate::compute(entry, existing);
    let mut items: Vec<DeliveryItem> = Vec::new();

    for requested in &input.items {
        let entry_item = entry
            .item(&requested.entry_item_id)
            .ok_or_else(|| CoreError::not_found("Entry item", requested.entry_item_id.as_str()))?;

        requested
            .size_quantities
            .validate_quantities("sizeQuantities")?;
        let sizes = requested.size_quantities.cleaned();
        if sizes.is_empty() {
            continue;
        }

        for (size, qty) in sizes.iter() {
            let remaining = aggregate.remaining_by_size(&entry_item.id, size);
            // Quantity already requested for this item earlier in the same input
            let pending_in_input: i64 = items
                .iter()
                .filter(|di| di.entry_item_id == entry_item.id)
                .map(|di| di.size_quantities.get(size))
                .sum();
            if qty + pending_in_input > remaining {
                return Err(CoreError::OverDelivery {
                    entry_item_id: entry_item.id.clone(),
                    size: size.to_string(),
                    remaining: remaining - pending_in_input,
                    requested: qty,
                });
            }
        }

        items.push(DeliveryItem {
            entry_id: entry.id.clone(),
            entry_item_id: entry_item.id.clone(),
            product_id: entry_item.product_id.clone(),
            size_quantities: sizes,
        });
    }

    if items.is_empty() {
        return Err(ValidationError::MustBePositive {
            field: "delivery quantities".to_string(),
        }
        .into());
    }
    Ok(items)
}

/// Builds the delivery to store. `id` and `now` come from the caller.
pub fn build_delivery(
    entry: &Entry,
    existing: &[Delivery],
    input: &DeliveryInput,
    id: String,
    now: DateTime<Utc>,
) -> CoreResult<Delivery> {
    let items = validate_delivery(entry, existing, input)?;
    Ok(Delivery {
        id,
        entry_code: entry.code.clone(),
        delivery_date: input.delivery_date.unwrap_or(now),
        who_delivered: input.who_delivered.trim().to_string(),
        items,
    })
}

/// Entry status once `deliveries` (including the new one) are counted.
pub fn status_after_deliveries(entry: &Entry, deliveries: &[Delivery]) -> EntryStatus {
    let aggregate = EntryAggregate::compute(entry, deliveries);
    after_delivery(entry.status, aggregate.total_ordered, aggregate.total_delivered)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryItem;
    use chrono::{NaiveDate, TimeZone};

    fn entry() -> Entry {
        Entry {
            id: "e1".to_string(),
            code: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            client_id: "c1".to_string(),
            who_input: "Ana".to_string(),
            status: EntryStatus::Received,
            items: vec![EntryItem {
                id: "a".to_string(),
                product_id: "p1".to_string(),
                product_ref: "REF".to_string(),
                description: "Polo".to_string(),
                size_quantities: SizeQuantities::from([("S", 10), ("M", 10)]),
                optional_ref1: None,
                optional_ref2: None,
                image_url: None,
            }],
            invoice_id: None,
            version: 0,
        }
    }

    fn input(parts: Vec<(&str, SizeQuantities)>) -> DeliveryInput {
        DeliveryInput {
            entry_id: "e1".to_string(),
            delivery_date: None,
            who_delivered: "Luis".to_string(),
            items: parts
                .into_iter()
                .map(|(id, sizes)| DeliveryItemInput {
                    entry_item_id: id.to_string(),
                    size_quantities: sizes,
                })
                .collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_worked_example_status_progression() {
        let e = entry();
        let d1 = build_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", 10)]))]), "d1".into(), now())
            .unwrap();
        let after_d1 = vec![d1];
        assert_eq!(status_after_deliveries(&e, &after_d1), EntryStatus::InProcess);

        let mut e = e;
        e.status = EntryStatus::InProcess;
        let d2 = build_delivery(&e, &after_d1, &input(vec![("a", SizeQuantities::from([("M", 10)]))]), "d2".into(), now())
            .unwrap();
        let mut all = after_d1;
        all.push(d2);
        assert_eq!(status_after_deliveries(&e, &all), EntryStatus::Delivered);

        let agg = EntryAggregate::compute(&e, &all);
        assert_eq!(agg.delivered_qty("a"), 20);
        assert_eq!(agg.pending_qty("a"), 0);
    }

    #[test]
    fn test_over_delivery_rejected() {
        let e = entry();
        let d1 = build_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", 8)]))]), "d1".into(), now())
            .unwrap();

        let err = validate_delivery(&e, &[d1], &input(vec![("a", SizeQuantities::from([("S", 3)]))]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::OverDelivery { remaining: 2, requested: 3, .. }
        ));
    }

    #[test]
    fn test_over_delivery_across_repeated_lines() {
        let e = entry();
        let err = validate_delivery(
            &e,
            &[],
            &input(vec![
                ("a", SizeQuantities::from([("S", 6)])),
                ("a", SizeQuantities::from([("S", 6)])),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::OverDelivery { .. }));
    }

    #[test]
    fn test_size_never_ordered_is_over_delivery() {
        let e = entry();
        let err = validate_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("XL", 1)]))]))
            .unwrap_err();
        assert!(matches!(err, CoreError::OverDelivery { remaining: 0, .. }));
    }

    #[test]
    fn test_zero_quantities_dropped_and_empty_rejected() {
        let e = entry();
        let items = validate_delivery(
            &e,
            &[],
            &input(vec![("a", SizeQuantities::from([("S", 0), ("M", 2)]))]),
        )
        .unwrap();
        assert_eq!(items[0].size_quantities, SizeQuantities::from([("M", 2)]));

        let err = validate_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", 0)]))]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_rejections() {
        let mut e = entry();
        assert!(matches!(
            validate_delivery(&e, &[], &input(vec![("ghost", SizeQuantities::from([("S", 1)]))])),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            validate_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", -1)]))])),
            Err(CoreError::Validation(ValidationError::Negative { .. }))
        ));

        assert!(matches!(
            validate_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", i64::MAX)]))])),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut nobody = input(vec![("a", SizeQuantities::from([("S", 1)]))]);
        nobody.who_delivered = String::new();
        assert!(validate_delivery(&e, &[], &nobody).is_err());
        nobody.who_delivered = "L".repeat(MAX_TEXT_LEN + 1);
        assert!(matches!(
            validate_delivery(&e, &[], &nobody),
            Err(CoreError::Validation(ValidationError::TooLong { .. }))
        ));

        e.invoice_id = Some("doc-1".to_string());
        assert!(matches!(
            validate_delivery(&e, &[], &input(vec![("a", SizeQuantities::from([("S", 1)]))])),
            Err(CoreError::EntryLocked { .. })
        ));
    }

    #[test]
    fn test_quantity_conservation_over_valid_sequence() {
        let e = entry();
        let mut deliveries: Vec<Delivery> = Vec::new();
        for (i, size) in ["S", "M", "S", "M", "S"].iter().enumerate() {
            let request = input(vec![("a", SizeQuantities::from([(*size, 4)]))]);
            if let Ok(d) = build_delivery(&e, &deliveries, &request, format!("d{}", i), now()) {
                deliveries.push(d);
            }
            let agg = EntryAggregate::compute(&e, &deliveries);
            assert!(agg.total_ordered >= agg.total_delivered);
        }
        // Third "S" of 4 would exceed the 10 ordered
        assert_eq!(EntryAggregate::compute(&e, &deliveries).delivered_by_size("a", "S"), 8);
    }
}
