//! # Invoice Totals & Payment Ledger
//!
//! ```text
//!   subtotal   = Σ item.total
//!   surcharges = Σ surcharge.amount
//!   tax        = round_half_up((subtotal + surcharges) × tax_rate)
//!   total      = subtotal + surcharges + tax
//!
//!   amount_paid = Σ payment.amount
//!   amount_due  = total − amount_paid
//! ```
//!
//! Two payment states coexist and are never merged:
//! - [`PaymentStatus`] is stored on the document (Paid/Pending), written
//!   at creation and on each payment;
//! - [`DerivedPaymentStatus`] adds `Overdue` and is recomputed on every read
//!   from a caller-supplied `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};
use crate::types::{DerivedPaymentStatus, Document, DocumentItem, Payment, PaymentStatus, Surcharge};
use crate::validation::{validate_max_len, validate_required, MAX_TEXT_LEN};

/// Figures of a document, computed once from its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub total_surcharges: Money,
    pub tax_rate: Rate,
    pub tax_amount: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Fails with [`CoreError::Overflow`] when a sum leaves the `i64` range.
    pub fn compute(
        items: &[DocumentItem],
        surcharges: &[Surcharge],
        tax_rate: Rate,
    ) -> CoreResult<Self> {
        let subtotal = checked_sum(items.iter().map(|i| i.total), "subtotal")?;
        let total_surcharges = checked_sum(surcharges.iter().map(|s| s.amount), "surcharges")?;
        let taxable = checked_sum([subtotal, total_surcharges], "taxable base")?;
        let tax_amount = taxable.percent_of(tax_rate);
        Ok(DocumentTotals {
            subtotal,
            total_surcharges,
            tax_rate,
            tax_amount,
            total: checked_sum([taxable, tax_amount], "total")?,
        })
    }
}

fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I, context: &str) -> CoreResult<Money> {
    amounts
        .into_iter()
        .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
        .ok_or_else(|| CoreError::Overflow {
            context: context.to_string(),
        })
}

// =============================================================================
// Payment Ledger
// =============================================================================

pub fn amount_paid(payments: &[Payment]) -> Money {
    payments.iter().map(|p| p.amount).sum()
}

/// Balance still owed. May be negative if the stored data is overpaid.
pub fn amount_due(document: &Document) -> Money {
    document.total - amount_paid(&document.payments)
}

/// Reporting status of a document at `now`.
///
/// Paid when nothing is due; otherwise Overdue once the document date is
/// more than `overdue_after_days` days before `now`; otherwise Pending.
/// A window too large for the calendar never turns overdue.
pub fn derived_status(
    document: &Document,
    now: DateTime<Utc>,
    overdue_after_days: i64,
) -> DerivedPaymentStatus {
    if amount_due(document) <= Money::zero() {
        DerivedPaymentStatus::Paid
    } else if Duration::try_days(overdue_after_days)
        .and_then(|window| now.checked_sub_signed(window))
        .is_some_and(|cutoff| document.date < cutoff)
    {
        DerivedPaymentStatus::Overdue
    } else {
        DerivedPaymentStatus::Pending
    }
}

/// Stored status after the payments of `document`.
pub fn stored_status(document: &Document) -> PaymentStatus {
    if amount_paid(&document.payments) >= document.total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    }
}

/// Authoritative check before a payment is appended.
pub fn validate_payment(document: &Document, payment: &Payment) -> CoreResult<()> {
    if !payment.amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }
    let due = amount_due(document);
    if payment.amount > due {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("amount {} exceeds amount due {}", payment.amount, due.max(Money::zero())),
        });
    }
    validate_required("method", &payment.method)?;
    validate_max_len("method", &payment.method, MAX_TEXT_LEN)?;
    if let Some(notes) = &payment.notes {
        validate_max_len("notes", notes, MAX_TEXT_LEN)?;
    }
    Ok(())
}

/// Appends a validated payment and refreshes the stored status.
pub fn apply_payment(document: &mut Document, payment: Payment) -> CoreResult<()> {
    validate_payment(document, &payment)?;
    document.payments.push(payment);
    document.payment_status = stored_status(document);
    Ok(())
}

// =============================================================================
// Summary (read view)
// =============================================================================

/// A document with its ledger figures, as shown in the history screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document: Document,
    pub amount_paid: Money,
    pub amount_due: Money,
    pub derived_status: DerivedPaymentStatus,
}

impl DocumentSummary {
    pub fn new(document: Document, now: DateTime<Utc>, overdue_after_days: i64) -> Self {
        let paid = amount_paid(&document.payments);
        let due = amount_due(&document);
        let derived = derived_status(&document, now, overdue_after_days);
        DocumentSummary {
            document,
            amount_paid: paid,
            // Display clamp; overpayment is rejected on write
            amount_due: due.max(Money::zero()),
            derived_status: derived,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::{DocumentType, EntryStatus};
    use chrono::TimeZone;

    fn line(total_cents: i64) -> DocumentItem {
        DocumentItem {
            product_id: "p1".to_string(),
            description: "Polo".to_string(),
            unit_price: Money::from_cents(total_cents),
            total: Money::from_cents(total_cents),
            entry_code: "1".to_string(),
            reference: "REF".to_string(),
            ordered_qty: 1,
            delivered_qty: 1,
            pending_qty: 0,
            last_delivery_date: None,
            status: EntryStatus::Delivered,
        }
    }

    fn document(total_cents: i64, date: DateTime<Utc>) -> Document {
        Document {
            id: "doc-1".to_string(),
            document_number: "FA-0001".to_string(),
            document_type: DocumentType::Factura,
            client_id: "c1".to_string(),
            date,
            entry_ids: vec!["e1".to_string()],
            items: vec![],
            subtotal: Money::zero(),
            surcharges: vec![],
            tax_rate: Rate::from_bps(2100),
            tax_amount: Money::zero(),
            total: Money::from_cents(total_cents),
            payment_status: PaymentStatus::Pending,
            payments: vec![],
            invoice_period_start: None,
            invoice_period_end: None,
        }
    }

    fn payment(cents: i64) -> Payment {
        Payment {
            amount: Money::from_cents(cents),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            method: "transfer".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_totals_identity() {
        let items = vec![line(10_000)];
        let surcharges = vec![Surcharge {
            reason: "test".to_string(),
            amount: Money::from_cents(1_000),
        }];
        let t = DocumentTotals::compute(&items, &surcharges, Rate::from_bps(2100)).unwrap();
        assert_eq!(t.subtotal.cents(), 10_000);
        assert_eq!(t.total_surcharges.cents(), 1_000);
        assert_eq!(t.tax_amount.cents(), 2_310);
        assert_eq!(t.total, t.subtotal + t.total_surcharges + t.tax_amount);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 0.50 at 21% = 0.105 -> 0.11
        let t = DocumentTotals::compute(&[line(50)], &[], Rate::from_bps(2100)).unwrap();
        assert_eq!(t.tax_amount.cents(), 11);
        assert_eq!(t.total.cents(), 61);
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let items = vec![line(i64::MAX), line(1)];
        assert!(matches!(
            DocumentTotals::compute(&items, &[], Rate::zero()),
            Err(CoreError::Overflow { .. })
        ));

        // Fits before tax, not after
        let err = DocumentTotals::compute(&[line(i64::MAX - 10)], &[], Rate::from_bps(2100))
            .unwrap_err();
        assert!(matches!(err, CoreError::Overflow { context } if context == "total"));
    }

    #[test]
    fn test_derived_status() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let recent = document(12_100, now - Duration::days(10));
        let old = document(12_100, now - Duration::days(31));

        assert_eq!(derived_status(&recent, now, 30), DerivedPaymentStatus::Pending);
        assert_eq!(derived_status(&old, now, 30), DerivedPaymentStatus::Overdue);

        let mut paid = old.clone();
        paid.payments.push(payment(12_100));
        assert_eq!(derived_status(&paid, now, 30), DerivedPaymentStatus::Paid);
    }

    #[test]
    fn test_huge_overdue_window_never_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let ancient = document(12_100, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(derived_status(&ancient, now, i64::MAX), DerivedPaymentStatus::Pending);
        assert_eq!(derived_status(&ancient, now, 3_650), DerivedPaymentStatus::Overdue);
    }

    #[test]
    fn test_overdue_is_not_written_back() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let old = document(12_100, now - Duration::days(90));
        let summary = DocumentSummary::new(old, now, 30);
        assert_eq!(summary.derived_status, DerivedPaymentStatus::Overdue);
        assert_eq!(summary.document.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_partial_then_final_payment() {
        let mut doc = document(12_100, Utc::now());
        apply_payment(&mut doc, payment(5_000)).unwrap();
        assert_eq!(doc.payment_status, PaymentStatus::Pending);
        assert_eq!(amount_due(&doc).cents(), 7_100);

        apply_payment(&mut doc, payment(7_100)).unwrap();
        assert_eq!(doc.payment_status, PaymentStatus::Paid);
        assert!(amount_due(&doc).is_zero());
    }

    #[test]
    fn test_payment_validation() {
        let doc = document(12_100, Utc::now());
        assert!(matches!(
            validate_payment(&doc, &payment(0)),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
        assert!(matches!(
            validate_payment(&doc, &payment(12_101)),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
        let mut no_method = payment(100);
        no_method.method = "  ".to_string();
        assert!(matches!(
            validate_payment(&doc, &no_method),
            Err(CoreError::Validation(_))
        ));
        let mut long_notes = payment(100);
        long_notes.notes = Some("n".repeat(MAX_TEXT_LEN + 1));
        assert!(matches!(
            validate_payment(&doc, &long_notes),
            Err(CoreError::Validation(ValidationError::TooLong { ref field, .. })) if field == "notes"
        ));
        assert!(validate_payment(&doc, &payment(12_100)).is_ok());
    }
}
