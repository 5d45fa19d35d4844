//! # Entry State Machine
//!
//! ```text
//!                 delivery              delivery
//!   Received ───────────────► InProcess ─────────► Delivered
//!      │      (0 < delivered)            (all)        │  ▲
//!      └──────────────────────────────────────────────┘  │
//!                   delivery (all at once)               │ reversal
//!                                                        │
//!   Delivered ──invoice(Prefactura)──► PreInvoiced ──────┤
//!   Delivered ──invoice(Factura)─────► Invoiced ─────────┘
//! ```
//!
//! Only three paths change status:
//! - delivery recording ([`after_delivery`]), from `Received`/`InProcess`;
//! - invoice generation ([`after_invoicing`]) and reversal ([`after_reversal`]);
//! - the manual override of the edit form ([`apply_manual_override`]), for
//!   privileged roles, only towards `Delivered` or `PreInvoiced`, and never
//!   on an entry linked to a document.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{DocumentType, Entry, EntryStatus, Role};

/// Status after a delivery was recorded.
///
/// Entries past `InProcess` keep their status: invoicing state is never
/// driven by deliveries.
pub fn after_delivery(current: EntryStatus, total_ordered: i64, total_delivered: i64) -> EntryStatus {
    match current {
        EntryStatus::Received | EntryStatus::InProcess => {
            if total_delivered >= total_ordered {
                EntryStatus::Delivered
            } else if total_delivered > 0 {
                EntryStatus::InProcess
            } else {
                EntryStatus::Received
            }
        }
        other => other,
    }
}

/// Statuses offered by the edit form: the current one, `Delivered` and
/// `PreInvoiced`, without duplicates.
pub fn manual_status_options(current: EntryStatus) -> Vec<EntryStatus> {
    let mut options = vec![current];
    for status in [EntryStatus::Delivered, EntryStatus::PreInvoiced] {
        if !options.contains(&status) {
            options.push(status);
        }
    }
    options
}

/// Validates a status change requested from the edit form.
///
/// Keeping the current status is always allowed. Any change requires a
/// privileged role and must be one of [`manual_status_options`]. A linked
/// entry only leaves `PreInvoiced`/`Invoiced` through reversal.
pub fn apply_manual_override(
    entry: &Entry,
    requested: EntryStatus,
    role: Role,
) -> CoreResult<EntryStatus> {
    let current = entry.status;
    if requested == current {
        return Ok(current);
    }
    if !role.is_privileged() {
        return Err(CoreError::Forbidden {
            action: "changing entry status".to_string(),
        });
    }
    if let Some(invoice_id) = &entry.invoice_id {
        return Err(CoreError::EntryLocked {
            entry_code: entry.code.clone(),
            invoice_id: invoice_id.clone(),
        });
    }
    if !manual_status_options(current).contains(&requested) {
        return Err(CoreError::InvalidStatusTransition {
            from: current,
            to: requested,
        });
    }
    Ok(requested)
}

/// Whether an entry can be selected for a new document.
pub fn is_invoiceable(entry: &Entry) -> bool {
    !entry.is_locked()
        && matches!(entry.status, EntryStatus::Delivered | EntryStatus::PreInvoiced)
}

/// Status of an entry once reconciled into a document of `document_type`.
pub fn after_invoicing(current: EntryStatus, document_type: DocumentType) -> CoreResult<EntryStatus> {
    let target = match document_type {
        DocumentType::Factura => EntryStatus::Invoiced,
        DocumentType::Prefactura => EntryStatus::PreInvoiced,
    };
    match current {
        EntryStatus::Delivered | EntryStatus::PreInvoiced => Ok(target),
        from => Err(CoreError::InvalidStatusTransition { from, to: target }),
    }
}

/// Status of an entry once its document is deleted, whatever it was.
pub const fn after_reversal(_current: EntryStatus) -> EntryStatus {
    EntryStatus::Delivered
}

// =============================================================================
// Status Groups
// =============================================================================

/// Listing tabs of the entry screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatusGroup {
    /// `Received` and `InProcess`.
    Pending,
    Delivered,
    PreInvoiced,
    Invoiced,
}

impl StatusGroup {
    pub const fn statuses(&self) -> &'static [EntryStatus] {
        match self {
            StatusGroup::Pending => &[EntryStatus::Received, EntryStatus::InProcess],
            StatusGroup::Delivered => &[EntryStatus::Delivered],
            StatusGroup::PreInvoiced => &[EntryStatus::PreInvoiced],
            StatusGroup::Invoiced => &[EntryStatus::Invoiced],
        }
    }

    pub fn contains(&self, status: EntryStatus) -> bool {
        self.statuses().contains(&status)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_after_delivery() {
        assert_eq!(after_delivery(EntryStatus::Received, 20, 0), EntryStatus::Received);
        assert_eq!(after_delivery(EntryStatus::Received, 20, 10), EntryStatus::InProcess);
        assert_eq!(after_delivery(EntryStatus::InProcess, 20, 20), EntryStatus::Delivered);
        assert_eq!(after_delivery(EntryStatus::Received, 20, 20), EntryStatus::Delivered);
    }

    #[test]
    fn test_delivery_never_moves_invoicing_states() {
        assert_eq!(after_delivery(EntryStatus::Delivered, 20, 5), EntryStatus::Delivered);
        assert_eq!(after_delivery(EntryStatus::PreInvoiced, 20, 20), EntryStatus::PreInvoiced);
        assert_eq!(after_delivery(EntryStatus::Invoiced, 20, 20), EntryStatus::Invoiced);
    }

    #[test]
    fn test_manual_options() {
        assert_eq!(
            manual_status_options(EntryStatus::InProcess),
            vec![EntryStatus::InProcess, EntryStatus::Delivered, EntryStatus::PreInvoiced]
        );
        assert_eq!(
            manual_status_options(EntryStatus::Delivered),
            vec![EntryStatus::Delivered, EntryStatus::PreInvoiced]
        );
    }

    fn entry(status: EntryStatus, invoice_id: Option<&str>) -> Entry {
        Entry {
            id: "e1".to_string(),
            code: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            client_id: "c1".to_string(),
            who_input: "Ana".to_string(),
            status,
            items: vec![],
            invoice_id: invoice_id.map(str::to_string),
            version: 0,
        }
    }

    #[test]
    fn test_manual_override_requires_admin() {
        let received = entry(EntryStatus::Received, None);
        let err = apply_manual_override(&received, EntryStatus::Delivered, Role::Manager).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));

        // No change is not an override
        assert_eq!(
            apply_manual_override(&received, EntryStatus::Received, Role::User).unwrap(),
            EntryStatus::Received
        );
    }

    #[test]
    fn test_manual_override_rejects_arbitrary_jumps() {
        let received = entry(EntryStatus::Received, None);
        assert_eq!(
            apply_manual_override(&received, EntryStatus::PreInvoiced, Role::Admin).unwrap(),
            EntryStatus::PreInvoiced
        );
        let err = apply_manual_override(&received, EntryStatus::Invoiced, Role::Admin).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidStatusTransition {
                from: EntryStatus::Received,
                to: EntryStatus::Invoiced
            }
        ));
        let delivered = entry(EntryStatus::Delivered, None);
        assert!(apply_manual_override(&delivered, EntryStatus::InProcess, Role::Admin).is_err());
    }

    #[test]
    fn test_manual_override_never_unlinks_invoiced_entries() {
        let invoiced = entry(EntryStatus::Invoiced, Some("doc-1"));
        for target in [EntryStatus::Delivered, EntryStatus::PreInvoiced] {
            let err = apply_manual_override(&invoiced, target, Role::Admin).unwrap_err();
            assert!(matches!(
                err,
                CoreError::EntryLocked { ref invoice_id, .. } if invoice_id == "doc-1"
            ));
        }

        let pre_invoiced = entry(EntryStatus::PreInvoiced, Some("doc-2"));
        assert!(matches!(
            apply_manual_override(&pre_invoiced, EntryStatus::Delivered, Role::Admin),
            Err(CoreError::EntryLocked { .. })
        ));

        // Keeping the status of a linked entry is still allowed
        assert_eq!(
            apply_manual_override(&invoiced, EntryStatus::Invoiced, Role::Admin).unwrap(),
            EntryStatus::Invoiced
        );
    }

    #[test]
    fn test_after_invoicing() {
        assert_eq!(
            after_invoicing(EntryStatus::Delivered, DocumentType::Factura).unwrap(),
            EntryStatus::Invoiced
        );
        assert_eq!(
            after_invoicing(EntryStatus::Delivered, DocumentType::Prefactura).unwrap(),
            EntryStatus::PreInvoiced
        );
        assert!(after_invoicing(EntryStatus::InProcess, DocumentType::Factura).is_err());
        assert!(after_invoicing(EntryStatus::Invoiced, DocumentType::Factura).is_err());
    }

    #[test]
    fn test_reversal_always_returns_to_delivered() {
        for status in [
            EntryStatus::Received,
            EntryStatus::InProcess,
            EntryStatus::PreInvoiced,
            EntryStatus::Invoiced,
        ] {
            assert_eq!(after_reversal(status), EntryStatus::Delivered);
        }
    }

    #[test]
    fn test_status_groups() {
        assert!(StatusGroup::Pending.contains(EntryStatus::Received));
        assert!(StatusGroup::Pending.contains(EntryStatus::InProcess));
        assert!(!StatusGroup::Pending.contains(EntryStatus::Delivered));
        assert!(StatusGroup::PreInvoiced.contains(EntryStatus::PreInvoiced));
    }
}
