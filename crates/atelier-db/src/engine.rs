//! # Reconciliation Engine
//!
//! Runs every multi-step operation as one SQLite transaction.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    read  (entries, deliveries, catalog, documents) on the tx connection │
//! │    rule  (atelier-core: validate, aggregate, price, plan)               │
//! │    write (versioned UPDATEs, INSERTs)                                   │
//! │  COMMIT  ← only when every step succeeded                               │
//! │                                                                         │
//! │  Any error drops the transaction: SQLite rolls back, nothing partial.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invoice Claim
//! ```text
//!   generate_invoice(E1, E2)
//!     ├─ build draft from E1(v3), E2(v7)
//!     ├─ INSERT document
//!     ├─ UPDATE E1 ... WHERE invoice_id IS NULL AND version = 3   ✓
//!     └─ UPDATE E2 ... WHERE invoice_id IS NULL AND version = 7   ✗
//!              │
//!              ├─ E2 linked meanwhile → ConcurrentInvoicingConflict
//!              └─ E2 edited meanwhile → ConcurrentModification
//!        (rollback: no document, E1 untouched)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::document::DocumentQuery;
use crate::repository::{client, delivery, document, entry, product};
use atelier_core::delivery::DeliveryInput;
use atelier_core::entry::{EntryChanges, NewEntry};
use atelier_core::invoice::{DocumentDraft, InvoiceRequest};
use atelier_core::numbering::{next_document_number, next_entry_code};
use atelier_core::reversal::{plan_reversal, EntryReset};
use atelier_core::status::{after_invoicing, is_invoiceable, StatusGroup};
use atelier_core::totals::{apply_payment, DocumentSummary};
use atelier_core::validation::in_date_range;
use atelier_core::{
    CoreError, Delivery, DerivedPaymentStatus, Document, Entry, EntryAggregate, EntryStatus,
    Payment, Rate, Role, DEFAULT_SPECIAL_CLIENT_NAME, DEFAULT_TAX_RATE, OVERDUE_AFTER_DAYS,
};

// =============================================================================
// Configuration & Reports
// =============================================================================

/// Business settings the engine applies on top of the pure rules.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Tax rate for documents that do not override it.
    pub tax_rate: Rate,
    /// Exact name of the client that gets the small-quantity surcharge.
    pub special_client_name: String,
    pub overdue_after_days: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            tax_rate: DEFAULT_TAX_RATE,
            special_client_name: DEFAULT_SPECIAL_CLIENT_NAME.to_string(),
            overdue_after_days: OVERDUE_AFTER_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub delivery: Delivery,
    /// The entry after its status moved.
    pub entry: Entry,
    pub aggregate: EntryAggregate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetails {
    pub entry: Entry,
    pub aggregate: EntryAggregate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalReport {
    pub document_id: String,
    pub document_number: String,
    pub resets: Vec<EntryReset>,
    /// Listed on the document but deleted since; skipped.
    pub missing_entry_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub document_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeletionReport {
    pub deleted: Vec<ReversalReport>,
    pub failed: Vec<BulkFailure>,
}

/// History filter. Dates are inclusive and apply to the document date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub status: Option<DerivedPaymentStatus>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Transactional entry point for everything that changes more than one row.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(pool: SqlitePool, config: ReconcilerConfig) -> Self {
        Reconciler { pool, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Entries
    // -------------------------------------------------------------------------

    /// Creates an entry in status `Received` with the next free code.
    pub async fn create_entry(&self, input: &NewEntry, who_input: &str) -> DbResult<Entry> {
        let mut tx = self.pool.begin().await?;

        ensure_client(&mut tx, &input.client_id).await?;
        let catalog = product::fetch_all(&mut tx).await?;
        let codes = entry::all_codes(&mut tx).await?;
        let code = next_entry_code(codes.iter().map(String::as_str));

        let created = atelier_core::entry::create_entry(
            input,
            new_id(),
            code,
            who_input,
            &catalog,
            &mut new_id,
        )?;
        entry::insert(&mut tx, &created).await?;
        tx.commit().await?;

        info!(
            id = %created.id,
            code = %created.code,
            client_id = %created.client_id,
            items = created.items.len(),
            "Entry created"
        );
        Ok(created)
    }

    /// Applies an edit. Status changes follow the manual override rule for
    /// `role`.
    pub async fn update_entry(&self, id: &str, changes: &EntryChanges, role: Role) -> DbResult<Entry> {
        let mut tx = self.pool.begin().await?;

        let current = entry::require(&mut tx, id).await?;
        if let Some(client_id) = &changes.client_id {
            ensure_client(&mut tx, client_id.trim()).await?;
        }
        let catalog = product::fetch_all(&mut tx).await?;

        let mut updated =
            atelier_core::entry::apply_changes(&current, changes, role, &catalog, &mut new_id)?;
        updated.version = entry::update_versioned(&mut tx, &updated).await?;
        tx.commit().await?;

        if updated.status != current.status {
            info!(
                code = %updated.code,
                from = current.status.as_str(),
                to = updated.status.as_str(),
                "Entry status overridden"
            );
        }
        info!(id = %updated.id, code = %updated.code, version = updated.version, "Entry updated");
        Ok(updated)
    }

    /// Deletes an entry. Its deliveries stay as orphans and a document
    /// listing it skips it on reversal.
    pub async fn delete_entry(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        entry::delete(&mut conn, id).await?;
        info!(id = %id, "Entry deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Deliveries
    // -------------------------------------------------------------------------

    /// Records a delivery and moves the entry's status, in one transaction.
    ///
    /// The entry row is rewritten with a version check even when its status
    /// does not change, so two deliveries against the same entry cannot
    /// both be validated against the same remaining quantities.
    pub async fn record_delivery(&self, input: &DeliveryInput) -> DbResult<DeliveryOutcome> {
        let mut tx = self.pool.begin().await?;

        let current = entry::require(&mut tx, &input.entry_id).await?;
        let mut deliveries = delivery::fetch_for_code(&mut tx, &current.code).await?;

        let recorded =
            atelier_core::delivery::build_delivery(&current, &deliveries, input, new_id(), Utc::now())?;
        delivery::insert(&mut tx, &recorded).await?;
        deliveries.push(recorded.clone());

        let mut updated = current.clone();
        updated.status = atelier_core::delivery::status_after_deliveries(&current, &deliveries);
        updated.version = entry::update_versioned(&mut tx, &updated).await?;

        let aggregate = EntryAggregate::compute(&updated, &deliveries);
        warn_over_delivered(&aggregate);

        tx.commit().await?;

        info!(
            delivery_id = %recorded.id,
            entry_code = %updated.code,
            delivered = aggregate.total_delivered,
            ordered = aggregate.total_ordered,
            status = updated.status.as_str(),
            "Delivery recorded"
        );

        Ok(DeliveryOutcome {
            delivery: recorded,
            entry: updated,
            aggregate,
        })
    }

    // -------------------------------------------------------------------------
    // Invoicing
    // -------------------------------------------------------------------------

    /// Computes the document that [`generate_invoice`](Self::generate_invoice)
    /// would store. Nothing is written.
    pub async fn preview_invoice(&self, request: &InvoiceRequest) -> DbResult<DocumentDraft> {
        let mut conn = self.pool.acquire().await?;
        let (draft, _) = self.build_draft(&mut conn, request).await?;
        Ok(draft)
    }

    /// Stores a document and links its entries to it.
    ///
    /// Fails with `ConcurrentInvoicingConflict` if any entry got linked to
    /// another document after it was read; nothing is stored in that case.
    pub async fn generate_invoice(&self, request: &InvoiceRequest) -> DbResult<Document> {
        let mut tx = self.pool.begin().await?;

        let (draft, entries) = self.build_draft(&mut tx, request).await?;
        let numbers = document::all_numbers(&mut tx).await?;
        let number = next_document_number(draft.document_type, numbers.iter().map(String::as_str));
        let created = draft.into_document(new_id(), number, Utc::now());

        document::insert(&mut tx, &created).await?;

        for claimed in &entries {
            let status = after_invoicing(claimed.status, created.document_type)?;
            if !entry::claim_for_invoice(&mut tx, claimed, &created.id, status).await? {
                return Err(claim_conflict(&mut tx, &claimed.id).await);
            }
            debug!(entry_code = %claimed.code, status = status.as_str(), "Entry claimed");
        }

        tx.commit().await?;

        info!(
            id = %created.id,
            number = %created.document_number,
            client_id = %created.client_id,
            entries = created.entry_ids.len(),
            total = %created.total,
            "Document generated"
        );
        Ok(created)
    }

    async fn build_draft(
        &self,
        conn: &mut SqliteConnection,
        request: &InvoiceRequest,
    ) -> DbResult<(DocumentDraft, Vec<Entry>)> {
        let ids = request.unique_entry_ids();
        let entries = entry::fetch_many(conn, &ids).await?;
        if let Some(missing) = ids.iter().find(|id| !entries.iter().any(|e| &e.id == *id)) {
            return Err(DbError::not_found("Entry", missing.as_str()));
        }

        let is_special_client = match entries.first() {
            Some(first) => {
                let owner = client::fetch(conn, &first.client_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Client", first.client_id.as_str()))?;
                owner.name == self.config.special_client_name
            }
            None => false,
        };

        let catalog = product::fetch_all(conn).await?;
        let codes: Vec<String> = entries.iter().map(|e| e.code.clone()).collect();
        let deliveries = delivery::fetch_for_codes(conn, &codes).await?;

        let draft = DocumentDraft::build(
            request,
            &entries,
            &catalog,
            &deliveries,
            is_special_client,
            self.config.tax_rate,
        )?;
        Ok((draft, entries))
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Appends a payment and refreshes the stored payment status.
    pub async fn add_payment(&self, document_id: &str, payment: Payment) -> DbResult<Document> {
        let mut tx = self.pool.begin().await?;

        let mut paid = document::require(&mut tx, document_id).await?;
        apply_payment(&mut paid, payment)?;
        document::update_payments(&mut tx, &paid).await?;

        tx.commit().await?;

        info!(
            id = %paid.id,
            number = %paid.document_number,
            payments = paid.payments.len(),
            status = ?paid.payment_status,
            "Payment added"
        );
        Ok(paid)
    }

    // -------------------------------------------------------------------------
    // Reversal
    // -------------------------------------------------------------------------

    /// Deletes a document and returns its entries to `Delivered`.
    ///
    /// Either the document is gone and every existing entry reset, or
    /// nothing changed.
    pub async fn delete_document(&self, id: &str) -> DbResult<ReversalReport> {
        let mut tx = self.pool.begin().await?;
        let report = reverse_document(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            id = %report.document_id,
            number = %report.document_number,
            reset = report.resets.len(),
            missing = report.missing_entry_ids.len(),
            "Document deleted and entries reset"
        );
        Ok(report)
    }

    /// Deletes several documents, each in its own transaction. A failure
    /// leaves that document untouched and does not stop the others.
    pub async fn delete_documents(&self, ids: &[String]) -> BulkDeletionReport {
        let mut report = BulkDeletionReport::default();

        for id in ids {
            match self.delete_document(id).await {
                Ok(reversal) => report.deleted.push(reversal),
                Err(err) => {
                    warn!(id = %id, error = %err, "Document deletion failed");
                    report.failed.push(BulkFailure {
                        document_id: id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Bulk document deletion finished"
        );
        report
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// Entry with its delivered and pending quantities.
    pub async fn entry_details(&self, id: &str) -> DbResult<EntryDetails> {
        let mut conn = self.pool.acquire().await?;
        let found = entry::require(&mut conn, id).await?;
        let deliveries = delivery::fetch_for_code(&mut conn, &found.code).await?;

        let aggregate = EntryAggregate::compute(&found, &deliveries);
        warn_over_delivered(&aggregate);

        Ok(EntryDetails {
            entry: found,
            aggregate,
        })
    }

    pub async fn list_entries(&self, group: StatusGroup) -> DbResult<Vec<Entry>> {
        entry::EntryRepository::new(self.pool.clone())
            .list_by_statuses(group.statuses())
            .await
    }

    /// Entries of `client_id` that can go on a new document, oldest first.
    pub async fn list_invoiceable(
        &self,
        client_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<Entry>> {
        let candidates = entry::EntryRepository::new(self.pool.clone())
            .list_by_statuses(&[EntryStatus::Delivered, EntryStatus::PreInvoiced])
            .await?;

        let mut invoiceable: Vec<Entry> = candidates
            .into_iter()
            .filter(|e| e.client_id == client_id)
            .filter(is_invoiceable)
            .filter(|e| in_date_range(e.date, from, to))
            .collect();
        invoiceable.reverse();
        Ok(invoiceable)
    }

    /// Document history with payment figures as of `now`, newest first.
    pub async fn list_documents(
        &self,
        filter: &DocumentFilter,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<DocumentSummary>> {
        let query = DocumentQuery {
            client_id: filter.client_id.clone(),
            from: filter.from,
            to: filter.to,
        };
        let mut conn = self.pool.acquire().await?;
        let documents = document::list(&mut conn, &query).await?;

        Ok(documents
            .into_iter()
            .map(|d| DocumentSummary::new(d, now, self.config.overdue_after_days))
            .filter(|s| filter.status.map_or(true, |status| s.derived_status == status))
            .collect())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

async fn ensure_client(conn: &mut SqliteConnection, client_id: &str) -> DbResult<()> {
    match client::fetch(conn, client_id).await? {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Client", client_id)),
    }
}

fn warn_over_delivered(aggregate: &EntryAggregate) {
    for item in aggregate.over_delivered() {
        warn!(
            entry_code = %aggregate.entry_code,
            entry_item_id = %item.entry_item_id,
            ordered = item.ordered,
            delivered = item.delivered,
            "Delivered quantity exceeds ordered quantity; pending clamped to zero"
        );
    }
}

/// Error for a claim that matched no row.
async fn claim_conflict(conn: &mut SqliteConnection, entry_id: &str) -> DbError {
    match entry::fetch(conn, entry_id).await {
        Ok(Some(Entry {
            invoice_id: Some(invoice_id),
            ..
        })) => CoreError::ConcurrentInvoicingConflict {
            entry_id: entry_id.to_string(),
            invoice_id,
        }
        .into(),
        Ok(Some(_)) => DbError::concurrent("Entry", entry_id),
        Ok(None) => DbError::not_found("Entry", entry_id),
        Err(err) => err,
    }
}

async fn reverse_document(conn: &mut SqliteConnection, id: &str) -> DbResult<ReversalReport> {
    let reversed = document::require(conn, id).await?;
    let entries = entry::fetch_many(conn, &reversed.entry_ids).await?;
    let plan = plan_reversal(&reversed, &entries);

    for reset in &plan.resets {
        if !entry::release_from_invoice(conn, &reset.entry_id, reset.to).await? {
            return Err(DbError::concurrent("Entry", reset.entry_id.as_str()));
        }
        debug!(entry_id = %reset.entry_id, from = reset.from.as_str(), "Entry reset");
    }
    for missing in &plan.missing_entry_ids {
        warn!(
            document = %reversed.document_number,
            entry_id = %missing,
            "Entry listed on document no longer exists; skipped"
        );
    }

    document::delete(conn, id).await?;

    Ok(ReversalReport {
        document_id: reversed.id,
        document_number: reversed.document_number,
        resets: plan.resets,
        missing_entry_ids: plan.missing_entry_ids,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
