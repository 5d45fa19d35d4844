//! # Reversal Coordinator
//!
//! Undoing a document: every entry it reconciled goes back to `Delivered`
//! with no invoice link, whatever its current status.
//!
//! ```text
//!   Document { entry_ids: [E1, E2, E3] }
//!        │
//!        ├── E1 (Invoiced)    ──► Delivered, invoice_id = None
//!        ├── E2 (PreInvoiced) ──► Delivered, invoice_id = None
//!        └── E3 (deleted)     ──► skipped (reported as missing)
//!        │
//!        ▼
//!   delete Document
//! ```
//!
//! This module only plans; the storage layer applies the plan and deletes
//! the document in one transaction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::status::after_reversal;
use crate::types::{Document, Entry, EntryStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntryReset {
    pub entry_id: String,
    pub from: EntryStatus,
    pub to: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReversalPlan {
    pub document_id: String,
    pub resets: Vec<EntryReset>,
    /// Listed in the document but no longer stored.
    pub missing_entry_ids: Vec<String>,
}

/// Plans the reversal of `document` given the entries that still exist.
pub fn plan_reversal(document: &Document, entries: &[Entry]) -> ReversalPlan {
    let mut resets = Vec::new();
    let mut missing_entry_ids = Vec::new();

    for entry_id in &document.entry_ids {
        match entries.iter().find(|e| &e.id == entry_id) {
            Some(entry) => resets.push(EntryReset {
                entry_id: entry.id.clone(),
                from: entry.status,
                to: after_reversal(entry.status),
            }),
            None => missing_entry_ids.push(entry_id.clone()),
        }
    }

    ReversalPlan {
        document_id: document.id.clone(),
        resets,
        missing_entry_ids,
    }
}
