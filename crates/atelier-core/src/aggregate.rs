//! # Delivery Aggregator
//!
//! Folds the deliveries of an entry into per-item delivered and pending
//! quantities.
//!
//! ## Matching
//! ```text
//!   Delivery.entry_code ══(exact string)══► Entry.code
//!   DeliveryItem.entry_item_id ═══════════► EntryItem.id
//!
//!   Delivery for another code     → ignored
//!   DeliveryItem for unknown item → ignored
//!   Negative delivered quantity   → counted as 0
//! ```
//!
//! The aggregate is a pure function of `(entry, deliveries)`: computing it
//! twice over the same input yields the same result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::{subtract, SizeQuantities};
use crate::types::{Delivery, Entry};

/// Reconciled quantities of one entry item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemAggregate {
    pub entry_item_id: String,
    pub ordered_by_size: SizeQuantities,
    pub delivered_by_size: SizeQuantities,
    pub ordered: i64,
    pub delivered: i64,
    /// `max(0, ordered - delivered)`
    pub pending: i64,
}

impl ItemAggregate {
    /// Units of `size` still to deliver.
    pub fn remaining_by_size(&self, size: &str) -> i64 {
        subtract(self.ordered_by_size.get(size), self.delivered_by_size.get(size))
    }

    pub fn is_over_delivered(&self) -> bool {
        self.delivered > self.ordered
    }
}

/// Reconciled quantities of a whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntryAggregate {
    pub entry_id: String,
    pub entry_code: String,
    /// One per entry item, in entry order.
    pub items: Vec<ItemAggregate>,
    #[ts(as = "Option<String>")]
    pub last_delivery_date: Option<DateTime<Utc>>,
    pub total_ordered: i64,
    pub total_delivered: i64,
}

impl EntryAggregate {
    /// Aggregates `deliveries` against `entry`.
    ///
    /// `deliveries` may contain deliveries of other entries; only those whose
    /// `entry_code` equals `entry.code` are counted.
    pub fn compute(entry: &Entry, deliveries: &[Delivery]) -> Self {
        let matching: Vec<&Delivery> = deliveries
            .iter()
            .filter(|d| d.entry_code == entry.code)
            .collect();

        let items: Vec<ItemAggregate> = entry
            .items
            .iter()
            .map(|item| {
                let mut delivered_by_size = SizeQuantities::new();
                for delivery in &matching {
                    for di in delivery
                        .items
                        .iter()
                        .filter(|di| di.entry_item_id == item.id)
                    {
                        let clamped: SizeQuantities =
                            di.size_quantities.iter().map(|(s, q)| (s, q.max(0))).collect();
                        delivered_by_size.merge(&clamped);
                    }
                }

                let ordered = item.size_quantities.total_units();
                let delivered = delivered_by_size.total_units();
                ItemAggregate {
                    entry_item_id: item.id.clone(),
                    ordered_by_size: item.size_quantities.clone(),
                    delivered_by_size,
                    ordered,
                    delivered,
                    pending: subtract(ordered, delivered),
                }
            })
            .collect();

        let last_delivery_date = matching.iter().map(|d| d.delivery_date).max();
        let total_ordered = items.iter().fold(0i64, |acc, i| acc.saturating_add(i.ordered));
        let total_delivered = items.iter().fold(0i64, |acc, i| acc.saturating_add(i.delivered));

        EntryAggregate {
            entry_id: entry.id.clone(),
            entry_code: entry.code.clone(),
            items,
            last_delivery_date,
            total_ordered,
            total_delivered,
        }
    }

    pub fn item(&self, entry_item_id: &str) -> Option<&ItemAggregate> {
        self.items.iter().find(|i| i.entry_item_id == entry_item_id)
    }

    /// Delivered units of an item; 0 for unknown items.
    pub fn delivered_qty(&self, entry_item_id: &str) -> i64 {
        self.item(entry_item_id).map_or(0, |i| i.delivered)
    }

    pub fn delivered_by_size(&self, entry_item_id: &str, size: &str) -> i64 {
        self.item(entry_item_id)
            .map_or(0, |i| i.delivered_by_size.get(size))
    }

    pub fn pending_qty(&self, entry_item_id: &str) -> i64 {
        self.item(entry_item_id).map_or(0, |i| i.pending)
    }

    pub fn remaining_by_size(&self, entry_item_id: &str, size: &str) -> i64 {
        self.item(entry_item_id)
            .map_or(0, |i| i.remaining_by_size(size))
    }

    /// Sum of the per-item pending quantities.
    pub fn total_pending(&self) -> i64 {
        self.items.iter().map(|i| i.pending).sum()
    }

    pub fn is_fully_delivered(&self) -> bool {
        self.total_delivered >= self.total_ordered
    }

    /// Items with more delivered than ordered.
    ///
    /// Never an error: such data can come from manual corrections. Callers
    /// that can log report it as a data-quality warning.
    pub fn over_delivered(&self) -> impl Iterator<Item = &ItemAggregate> {
        self.items.iter().filter(|i| i.is_over_delivered())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeliveryItem, EntryItem, EntryStatus};
    use chrono::{NaiveDate, TimeZone};

    fn item(id: &str, sizes: SizeQuantities) -> EntryItem {
        EntryItem {
            id: id.to_string(),
            product_id: format!("prod-{}", id),
            product_ref: format!("REF-{}", id),
            description: String::new(),
            size_quantities: sizes,
            optional_ref1: None,
            optional_ref2: None,
            image_url: None,
        }
    }

    fn entry(code: &str, items: Vec<EntryItem>) -> Entry {
        Entry {
            id: format!("entry-{}", code),
            code: code.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            client_id: "client-1".to_string(),
            who_input: "Ana".to_string(),
            status: EntryStatus::Received,
            items,
            invoice_id: None,
            version: 0,
        }
    }

    fn delivery(code: &str, day: u32, parts: Vec<(&str, SizeQuantities)>) -> Delivery {
        Delivery {
            id: format!("del-{}-{}", code, day),
            entry_code: code.to_string(),
            delivery_date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            who_delivered: "Luis".to_string(),
            items: parts
                .into_iter()
                .map(|(item_id, sizes)| DeliveryItem {
                    entry_id: format!("entry-{}", code),
                    entry_item_id: item_id.to_string(),
                    product_id: format!("prod-{}", item_id),
                    size_quantities: sizes,
                })
                .collect(),
        }
    }

    #[test]
    fn test_partial_then_full_delivery() {
        let e = entry("1", vec![item("a", SizeQuantities::from([("S", 10), ("M", 10)]))]);
        let d1 = delivery("1", 2, vec![("a", SizeQuantities::from([("S", 10)]))]);

        let agg = EntryAggregate::compute(&e, &[d1.clone()]);
        assert_eq!(agg.delivered_qty("a"), 10);
        assert_eq!(agg.pending_qty("a"), 10);
        assert_eq!(agg.remaining_by_size("a", "S"), 0);
        assert_eq!(agg.remaining_by_size("a", "M"), 10);

        let d2 = delivery("1", 5, vec![("a", SizeQuantities::from([("M", 10)]))]);
        let agg = EntryAggregate::compute(&e, &[d1, d2.clone()]);
        assert_eq!(agg.delivered_qty("a"), 20);
        assert_eq!(agg.pending_qty("a"), 0);
        assert_eq!(agg.last_delivery_date, Some(d2.delivery_date));
        assert!(agg.is_fully_delivered());
    }

    #[test]
    fn test_empty_entry_yields_zero_aggregates() {
        let e = entry("1", vec![]);
        let agg = EntryAggregate::compute(&e, &[]);
        assert_eq!(agg.total_ordered, 0);
        assert_eq!(agg.total_delivered, 0);
        assert_eq!(agg.total_pending(), 0);
        assert!(agg.last_delivery_date.is_none());
    }

    #[test]
    fn test_matching_is_by_exact_code() {
        let e = entry("7", vec![item("a", SizeQuantities::from([("S", 5)]))]);
        let other = delivery("70", 2, vec![("a", SizeQuantities::from([("S", 5)]))]);
        let padded = delivery(" 7", 3, vec![("a", SizeQuantities::from([("S", 5)]))]);

        let agg = EntryAggregate::compute(&e, &[other, padded]);
        assert_eq!(agg.total_delivered, 0);
        assert!(agg.last_delivery_date.is_none());
    }

    #[test]
    fn test_unknown_item_and_negative_quantities_ignored() {
        let e = entry("1", vec![item("a", SizeQuantities::from([("S", 5)]))]);
        let d = delivery(
            "1",
            2,
            vec![
                ("ghost", SizeQuantities::from([("S", 3)])),
                ("a", SizeQuantities::from([("S", -2), ("M", 1)])),
            ],
        );
        let agg = EntryAggregate::compute(&e, &[d]);
        assert_eq!(agg.delivered_qty("a"), 1);
        assert_eq!(agg.delivered_by_size("a", "S"), 0);
        assert_eq!(agg.delivered_qty("ghost"), 0);
    }

    #[test]
    fn test_over_delivery_clamps_pending() {
        let e = entry("1", vec![item("a", SizeQuantities::from([("S", 5)]))]);
        let d = delivery("1", 2, vec![("a", SizeQuantities::from([("S", 8)]))]);
        let agg = EntryAggregate::compute(&e, &[d]);
        assert_eq!(agg.pending_qty("a"), 0);
        assert_eq!(agg.over_delivered().count(), 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let e = entry(
            "1",
            vec![
                item("a", SizeQuantities::from([("S", 4), ("M", 6)])),
                item("b", SizeQuantities::from([("L", 3)])),
            ],
        );
        let deliveries = vec![
            delivery("1", 2, vec![("a", SizeQuantities::from([("S", 4)]))]),
            delivery("1", 3, vec![("b", SizeQuantities::from([("L", 1)]))]),
            delivery("2", 3, vec![("b", SizeQuantities::from([("L", 2)]))]),
        ];

        let first = EntryAggregate::compute(&e, &deliveries);
        let second = EntryAggregate::compute(&e, &deliveries);
        assert_eq!(first, second);
        assert_eq!(first.total_delivered, 5);
        assert_eq!(first.total_pending(), 8);
    }
}
