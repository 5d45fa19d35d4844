//! # Invoice Line Generator
//!
//! Turns a selection of entries into priced document lines and surcharges.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for entry in selection (one client only):                              │
//! │    aggregate = EntryAggregate::compute(entry, deliveries)               │
//! │    for item in entry.items:                                             │
//! │      product missing or price == 0  → skip ("needs pricing")           │
//! │      delivered == 0                 → skip (nothing to bill)           │
//! │      line.total = delivered × unit_price                                │
//! │                                                                         │
//! │      Pool A: special client and delivered ≤ 20        → base_a += total │
//! │      Pool B: threshold, rate > 0, delivered ≤ threshold,                │
//! │              and NOT counted in Pool A                → base_b += total │
//! │                                                                         │
//! │  base_a > 0 → Surcharge(10% of base_a)                                  │
//! │  base_b > 0 → Surcharge(rate of base_b)                                 │
//! │  no lines   → NoBillableItems                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unit prices are never touched by surcharges; surcharges are separate
//! additive amounts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregate::EntryAggregate;
use crate::catalog::ProductCatalog;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Rate};
use crate::status::after_invoicing;
use crate::totals::DocumentTotals;
use crate::types::{
    Delivery, Document, DocumentItem, DocumentType, Entry, PaymentStatus, Surcharge,
};
use crate::validation::{validate_date_range, validate_percent, validate_tax_percent};
use crate::{SPECIAL_CLIENT_SURCHARGE_RATE, SPECIAL_CLIENT_SURCHARGE_THRESHOLD};

// =============================================================================
// Surcharge Configuration
// =============================================================================

/// Surcharge settings for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SurchargeConfig {
    /// Client name matches the configured special client.
    pub is_special_client: bool,
    /// Pool B applies to lines with at most this many delivered units. 0 disables it.
    pub quantity_threshold: i64,
    /// Pool B rate. Zero disables it.
    pub surcharge_rate: Rate,
}

impl SurchargeConfig {
    fn in_special_pool(&self, delivered: i64) -> bool {
        self.is_special_client && delivered > 0 && delivered <= SPECIAL_CLIENT_SURCHARGE_THRESHOLD
    }

    fn in_dynamic_pool(&self, delivered: i64) -> bool {
        self.quantity_threshold > 0
            && !self.surcharge_rate.is_zero()
            && delivered > 0
            && delivered <= self.quantity_threshold
            && !self.in_special_pool(delivered)
    }
}

pub fn special_surcharge_reason() -> String {
    format!(
        "small-quantity surcharge (≤{} units)",
        SPECIAL_CLIENT_SURCHARGE_THRESHOLD
    )
}

pub fn dynamic_surcharge_reason(rate: Rate, threshold: i64) -> String {
    format!("quantity surcharge ({}%) for orders ≤ {} units", rate, threshold)
}

// =============================================================================
// Line Generation
// =============================================================================

/// Output of [`generate_lines`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLines {
    pub client_id: String,
    pub items: Vec<DocumentItem>,
    pub surcharges: Vec<Surcharge>,
}

fn overflow(context: &str) -> CoreError {
    CoreError::Overflow {
        context: context.to_string(),
    }
}

/// Checks that every entry belongs to the first entry's client.
pub fn ensure_single_client(entries: &[Entry]) -> CoreResult<&str> {
    let first = entries
        .first()
        .ok_or_else(|| ValidationError::required("entries"))?;
    if let Some(other) = entries.iter().find(|e| e.client_id != first.client_id) {
        return Err(CoreError::MixedClients {
            expected: first.client_id.clone(),
            found: other.client_id.clone(),
        });
    }
    Ok(&first.client_id)
}

/// Prices the delivered quantities of `entries`.
///
/// `deliveries` may contain deliveries of any entry; each entry only
/// counts its own.
pub fn generate_lines<C>(
    entries: &[Entry],
    catalog: &C,
    deliveries: &[Delivery],
    config: &SurchargeConfig,
) -> CoreResult<InvoiceLines>
where
    C: ProductCatalog + ?Sized,
{
    let client_id = ensure_single_client(entries)?.to_string();

    let mut items = Vec::new();
    let mut special_base = Money::zero();
    let mut dynamic_base = Money::zero();
    // Pool bases are partial sums of this one
    let mut billed = Money::zero();

    for entry in entries {
        let aggregate = EntryAggregate::compute(entry, deliveries);

        for item in &entry.items {
            let product = match catalog.product(&item.product_id) {
                Some(p) if p.is_priced() => p,
                _ => continue,
            };
            let Some(agg) = aggregate.item(&item.id) else {
                continue;
            };
            if agg.delivered <= 0 {
                continue;
            }

            let total = product
                .price
                .checked_mul_quantity(agg.delivered)
                .ok_or_else(|| overflow("line total"))?;
            billed = billed.checked_add(total).ok_or_else(|| overflow("subtotal"))?;

            if config.in_special_pool(agg.delivered) {
                special_base += total;
            } else if config.in_dynamic_pool(agg.delivered) {
                dynamic_base += total;
            }

            items.push(DocumentItem {
                product_id: product.id.clone(),
                description: if item.description.is_empty() {
                    product.model_name.clone()
                } else {
                    item.description.clone()
                },
                unit_price: product.price,
                total,
                entry_code: entry.code.clone(),
                reference: item.product_ref.clone(),
                ordered_qty: agg.ordered,
                delivered_qty: agg.delivered,
                pending_qty: agg.pending,
                last_delivery_date: aggregate.last_delivery_date,
                status: entry.status,
            });
        }
    }

    if items.is_empty() {
        return Err(CoreError::NoBillableItems);
    }

    let mut surcharges = Vec::new();
    if special_base.is_positive() {
        surcharges.push(Surcharge {
            reason: special_surcharge_reason(),
            amount: special_base.percent_of(SPECIAL_CLIENT_SURCHARGE_RATE),
        });
    }
    if dynamic_base.is_positive() {
        surcharges.push(Surcharge {
            reason: dynamic_surcharge_reason(config.surcharge_rate, config.quantity_threshold),
            amount: dynamic_base.percent_of(config.surcharge_rate),
        });
    }

    Ok(InvoiceLines {
        client_id,
        items,
        surcharges,
    })
}

// =============================================================================
// Draft
// =============================================================================

/// What the caller asks for when generating a document.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    pub document_type: DocumentType,
    pub entry_ids: Vec<String>,
    #[serde(default)]
    pub quantity_threshold: i64,
    /// Pool B rate in percent, 0 to 100. Zero disables Pool B.
    #[serde(default)]
    pub surcharge_percent: f64,
    /// Overrides the configured tax rate, in percent.
    #[serde(default)]
    pub tax_percent: Option<f64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub invoice_period_start: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub invoice_period_end: Option<NaiveDate>,
}

impl InvoiceRequest {
    /// Entry ids in request order without duplicates.
    pub fn unique_entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.entry_ids.len());
        for id in &self.entry_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// A fully computed document that is not persisted yet (the preview).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub document_type: DocumentType,
    pub client_id: String,
    pub entry_ids: Vec<String>,
    pub items: Vec<DocumentItem>,
    pub surcharges: Vec<Surcharge>,
    pub totals: DocumentTotals,
    #[ts(as = "Option<String>")]
    pub invoice_period_start: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub invoice_period_end: Option<NaiveDate>,
}

/// Rejects entries that cannot go on a new document.
///
/// An entry already linked to a document is a conflict; any other
/// non-invoiceable status is an invalid transition.
pub fn ensure_invoiceable(entries: &[Entry], document_type: DocumentType) -> CoreResult<()> {
    for entry in entries {
        if let Some(invoice_id) = &entry.invoice_id {
            return Err(CoreError::ConcurrentInvoicingConflict {
                entry_id: entry.id.clone(),
                invoice_id: invoice_id.clone(),
            });
        }
        after_invoicing(entry.status, document_type)?;
    }
    Ok(())
}

impl DocumentDraft {
    /// Builds the preview of a document over `entries`.
    ///
    /// `entries` must be the entries named by the request, already loaded.
    pub fn build<C>(
        request: &InvoiceRequest,
        entries: &[Entry],
        catalog: &C,
        deliveries: &[Delivery],
        is_special_client: bool,
        tax_rate: Rate,
    ) -> CoreResult<Self>
    where
        C: ProductCatalog + ?Sized,
    {
        if entries.is_empty() {
            return Err(ValidationError::required("entries").into());
        }
        validate_date_range(
            "invoicePeriod",
            request.invoice_period_start,
            request.invoice_period_end,
        )?;
        if let Some(pct) = request.tax_percent {
            validate_tax_percent(pct)?;
        }
        validate_percent("surchargePercent", request.surcharge_percent)?;
        if request.quantity_threshold < 0 {
            return Err(ValidationError::Negative {
                field: "quantityThreshold".to_string(),
            }
            .into());
        }

        ensure_single_client(entries)?;
        ensure_invoiceable(entries, request.document_type)?;

        let config = SurchargeConfig {
            is_special_client,
            quantity_threshold: request.quantity_threshold,
            surcharge_rate: Rate::from_percentage(request.surcharge_percent),
        };
        let lines = generate_lines(entries, catalog, deliveries, &config)?;
        let tax_rate = request.tax_percent.map(Rate::from_percentage).unwrap_or(tax_rate);
        let totals = DocumentTotals::compute(&lines.items, &lines.surcharges, tax_rate)?;

        Ok(DocumentDraft {
            document_type: request.document_type,
            client_id: lines.client_id,
            entry_ids: entries.iter().map(|e| e.id.clone()).collect(),
            items: lines.items,
            surcharges: lines.surcharges,
            totals,
            invoice_period_start: request.invoice_period_start,
            invoice_period_end: request.invoice_period_end,
        })
    }

    /// The document as it will be stored, with no payments yet.
    pub fn into_document(self, id: String, document_number: String, date: DateTime<Utc>) -> Document {
        Document {
            id,
            document_number,
            document_type: self.document_type,
            client_id: self.client_id,
            date,
            entry_ids: self.entry_ids,
            items: self.items,
            subtotal: self.totals.subtotal,
            surcharges: self.surcharges,
            tax_rate: self.totals.tax_rate,
            tax_amount: self.totals.tax_amount,
            total: self.totals.total,
            payment_status: PaymentStatus::Pending,
            payments: Vec::new(),
            invoice_period_start: self.invoice_period_start,
            invoice_period_end: self.invoice_period_end,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
