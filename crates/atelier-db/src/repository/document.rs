//! # Document Repository
//!
//! Invoices and pre-invoices. A document is written once, with its lines
//! and totals frozen; afterwards only the payment columns change.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scalar columns      document_number, type, client_id, date, totals    │
//! │  JSON columns        entry_ids_json, items_json, surcharges_json,       │
//! │                      payments_json                                      │
//! │  money               *_cents INTEGER       rate   tax_rate_bps INTEGER  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use atelier_core::{Document, Money, Rate};

const DOCUMENT_COLUMNS: &str = "id, document_number, document_type, client_id, date, \
     entry_ids_json, items_json, subtotal_cents, surcharges_json, tax_rate_bps, \
     tax_amount_cents, total_cents, payment_status, payments_json, \
     invoice_period_start, invoice_period_end";

fn document_from_row(row: &SqliteRow) -> DbResult<Document> {
    let entry_ids_json: String = row.try_get("entry_ids_json")?;
    let items_json: String = row.try_get("items_json")?;
    let surcharges_json: String = row.try_get("surcharges_json")?;
    let payments_json: String = row.try_get("payments_json")?;

    Ok(Document {
        id: row.try_get("id")?,
        document_number: row.try_get("document_number")?,
        document_type: row.try_get("document_type")?,
        client_id: row.try_get("client_id")?,
        date: row.try_get("date")?,
        entry_ids: from_json(&entry_ids_json)?,
        items: from_json(&items_json)?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        surcharges: from_json(&surcharges_json)?,
        tax_rate: Rate::from_bps(row.try_get("tax_rate_bps")?),
        tax_amount: Money::from_cents(row.try_get("tax_amount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        payment_status: row.try_get("payment_status")?,
        payments: from_json(&payments_json)?,
        invoice_period_start: row.try_get("invoice_period_start")?,
        invoice_period_end: row.try_get("invoice_period_end")?,
    })
}

/// Stored-side filter of the document history. The derived payment status
/// depends on the current time and is filtered by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    #[serde(default)]
    pub client_id: Option<String>,
    /// Inclusive, on the document date.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive, on the document date.
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

// =============================================================================
// Connection-level statements
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Document>> {
    let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(document_from_row).transpose()
}

pub(crate) async fn require(conn: &mut SqliteConnection, id: &str) -> DbResult<Document> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Document", id))
}

/// Every document number ever issued, of both types.
pub(crate) async fn all_numbers(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let numbers: Vec<String> = sqlx::query_scalar("SELECT document_number FROM documents")
        .fetch_all(&mut *conn)
        .await?;
    Ok(numbers)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, document: &Document) -> DbResult<()> {
    debug!(
        id = %document.id,
        number = %document.document_number,
        entries = document.entry_ids.len(),
        total = %document.total,
        "Inserting document"
    );

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, document_number, document_type, client_id, date,
            entry_ids_json, items_json, subtotal_cents, surcharges_json,
            tax_rate_bps, tax_amount_cents, total_cents, payment_status,
            payments_json, invoice_period_start, invoice_period_end, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&document.id)
    .bind(&document.document_number)
    .bind(document.document_type)
    .bind(&document.client_id)
    .bind(document.date)
    .bind(to_json(&document.entry_ids)?)
    .bind(to_json(&document.items)?)
    .bind(document.subtotal.cents())
    .bind(to_json(&document.surcharges)?)
    .bind(document.tax_rate.bps())
    .bind(document.tax_amount.cents())
    .bind(document.total.cents())
    .bind(document.payment_status)
    .bind(to_json(&document.payments)?)
    .bind(document.invoice_period_start)
    .bind(document.invoice_period_end)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the payment list and stored status of `document`.
pub(crate) async fn update_payments(conn: &mut SqliteConnection, document: &Document) -> DbResult<()> {
    debug!(
        id = %document.id,
        payments = document.payments.len(),
        "Updating document payments"
    );

    let result = sqlx::query(
        r#"
        UPDATE documents SET payments_json = ?2, payment_status = ?3
        WHERE id = ?1
        "#,
    )
    .bind(&document.id)
    .bind(to_json(&document.payments)?)
    .bind(document.payment_status)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Document", document.id.as_str()));
    }
    Ok(())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting document");

    let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Document", id));
    }
    Ok(())
}

pub(crate) async fn list(conn: &mut SqliteConnection, query: &DocumentQuery) -> DbResult<Vec<Document>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM documents WHERE 1 = 1", DOCUMENT_COLUMNS));

    if let Some(client_id) = &query.client_id {
        qb.push(" AND client_id = ").push_bind(client_id.clone());
    }
    // Dates are stored as RFC 3339 text; the first ten characters are the day
    if let Some(from) = query.from {
        qb.push(" AND substr(date, 1, 10) >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND substr(date, 1, 10) <= ").push_bind(to);
    }
    qb.push(" ORDER BY date DESC, document_number DESC");

    let rows = qb.build().fetch_all(&mut *conn).await?;
    rows.iter().map(document_from_row).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for document reads.
///
/// Creating, paying and deleting documents touch entries as well and go
/// through the [`Reconciler`](crate::engine::Reconciler).
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn get_by_number(&self, document_number: &str) -> DbResult<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE document_number = ?1",
            DOCUMENT_COLUMNS
        ))
        .bind(document_number)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    /// Documents matching `query`, newest first.
    pub async fn list(&self, query: &DocumentQuery) -> DbResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn, query).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::client;
    use atelier_core::{
        Client, DocumentItem, DocumentType, EntryStatus, Payment, PaymentStatus, Surcharge,
    };
    use chrono::TimeZone;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        for id in ["c1", "c2"] {
            client::insert(
                &mut conn,
                &Client {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    address: String::new(),
                    email: String::new(),
                    phone: String::new(),
                    vat_number: String::new(),
                },
            )
            .await
            .unwrap();
        }
        drop(conn);
        db
    }

    fn document(id: &str, number: &str, client_id: &str, day: u32) -> Document {
        Document {
            id: id.to_string(),
            document_number: number.to_string(),
            document_type: DocumentType::Factura,
            client_id: client_id.to_string(),
            date: Utc.with_ymd_and_hms(2024, 6, day, 12, 30, 0).unwrap(),
            entry_ids: vec!["e1".to_string()],
            items: vec![DocumentItem {
                product_id: "p1".to_string(),
                description: "Polo".to_string(),
                unit_price: Money::from_cents(500),
                total: Money::from_cents(10_000),
                entry_code: "1".to_string(),
                reference: "POL-001".to_string(),
                ordered_qty: 20,
                delivered_qty: 20,
                pending_qty: 0,
                last_delivery_date: None,
                status: EntryStatus::Delivered,
            }],
            subtotal: Money::from_cents(10_000),
            surcharges: vec![Surcharge {
                reason: "test".to_string(),
                amount: Money::zero(),
            }],
            tax_rate: Rate::from_bps(2100),
            tax_amount: Money::from_cents(2_100),
            total: Money::from_cents(12_100),
            payment_status: PaymentStatus::Pending,
            payments: Vec::new(),
            invoice_period_start: NaiveDate::from_ymd_opt(2024, 6, 1),
            invoice_period_end: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let db = setup().await;
        let doc = document("d1", "FA-0001", "c1", 3);
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &doc).await.unwrap();
        assert_eq!(all_numbers(&mut conn).await.unwrap(), vec!["FA-0001".to_string()]);
        drop(conn);

        assert_eq!(db.documents().get_by_id("d1").await.unwrap(), Some(doc.clone()));
        assert_eq!(db.documents().get_by_number("FA-0001").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &document("d1", "FA-0001", "c1", 3)).await.unwrap();
        let err = insert(&mut conn, &document("d2", "FA-0001", "c1", 3)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_payments() {
        let db = setup().await;
        let mut doc = document("d1", "FA-0001", "c1", 3);
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &doc).await.unwrap();

        doc.payments.push(Payment {
            amount: Money::from_cents(12_100),
            date: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
            method: "transfer".to_string(),
            notes: None,
        });
        doc.payment_status = PaymentStatus::Paid;
        update_payments(&mut conn, &doc).await.unwrap();

        let loaded = require(&mut conn, "d1").await.unwrap();
        assert_eq!(loaded.payments.len(), 1);
        assert_eq!(loaded.payment_status, PaymentStatus::Paid);

        delete(&mut conn, "d1").await.unwrap();
        assert!(matches!(delete(&mut conn, "d1").await, Err(DbError::NotFound { .. })));
        assert!(matches!(update_payments(&mut conn, &doc).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &document("d1", "FA-0001", "c1", 1)).await.unwrap();
        insert(&mut conn, &document("d2", "FA-0002", "c1", 10)).await.unwrap();
        insert(&mut conn, &document("d3", "FA-0003", "c2", 10)).await.unwrap();
        drop(conn);

        let all = db.documents().list(&DocumentQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "d3");

        let c1_june_10 = db
            .documents()
            .list(&DocumentQuery {
                client_id: Some("c1".to_string()),
                from: NaiveDate::from_ymd_opt(2024, 6, 10),
                to: NaiveDate::from_ymd_opt(2024, 6, 10),
            })
            .await
            .unwrap();
        assert_eq!(c1_june_10.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["d2"]);
    }
}
