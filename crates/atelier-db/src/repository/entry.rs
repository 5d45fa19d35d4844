//! # Entry Repository
//!
//! Entries with their items (JSON column) and optimistic version.
//!
//! ## Versioned Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE entries SET ..., version = version + 1                         │
//! │  WHERE id = ? AND version = <version read>                             │
//! │                                                                         │
//! │  rows_affected = 1 → write applied                                     │
//! │  rows_affected = 0 → row changed (or vanished) since it was read       │
//! │                      → DbError::ConcurrentModification / NotFound       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The invoice claim is the same pattern with `invoice_id IS NULL` added,
//! so two documents can never link the same entry.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use atelier_core::{Entry, EntryItem, EntryStatus};

const ENTRY_COLUMNS: &str = "id, code, date, client_id, who_input, status, items_json, invoice_id, version";

fn entry_from_row(row: &SqliteRow) -> DbResult<Entry> {
    let items_json: String = row.try_get("items_json")?;
    let items: Vec<EntryItem> = from_json(&items_json)?;
    Ok(Entry {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        date: row.try_get("date")?,
        client_id: row.try_get("client_id")?,
        who_input: row.try_get("who_input")?,
        status: row.try_get("status")?,
        items,
        invoice_id: row.try_get("invoice_id")?,
        version: row.try_get("version")?,
    })
}

// =============================================================================
// Connection-level statements
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Entry>> {
    let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(entry_from_row).transpose()
}

pub(crate) async fn require(conn: &mut SqliteConnection, id: &str) -> DbResult<Entry> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Entry", id))
}

/// Entries with the given ids, in the order of `ids`. Missing ids are
/// simply absent from the result.
pub(crate) async fn fetch_many(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Entry>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM entries WHERE id IN (", ENTRY_COLUMNS));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows = qb.build().fetch_all(&mut *conn).await?;
    let mut entries = rows.iter().map(entry_from_row).collect::<DbResult<Vec<_>>>()?;
    entries.sort_by_key(|e| ids.iter().position(|id| id == &e.id));
    Ok(entries)
}

pub(crate) async fn all_codes(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let codes: Vec<String> = sqlx::query_scalar("SELECT code FROM entries")
        .fetch_all(&mut *conn)
        .await?;
    Ok(codes)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, entry: &Entry) -> DbResult<()> {
    debug!(id = %entry.id, code = %entry.code, "Inserting entry");

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO entries (
            id, code, date, client_id, who_input, status,
            items_json, invoice_id, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.code)
    .bind(entry.date)
    .bind(&entry.client_id)
    .bind(&entry.who_input)
    .bind(entry.status)
    .bind(to_json(&entry.items)?)
    .bind(&entry.invoice_id)
    .bind(entry.version)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the editable fields of `entry` if its version is still current.
///
/// Returns the new version.
pub(crate) async fn update_versioned(conn: &mut SqliteConnection, entry: &Entry) -> DbResult<i64> {
    debug!(id = %entry.id, version = entry.version, status = entry.status.as_str(), "Updating entry");

    let result = sqlx::query(
        r#"
        UPDATE entries SET
            date = ?3,
            client_id = ?4,
            status = ?5,
            items_json = ?6,
            invoice_id = ?7,
            updated_at = ?8,
            version = version + 1
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(&entry.id)
    .bind(entry.version)
    .bind(entry.date)
    .bind(&entry.client_id)
    .bind(entry.status)
    .bind(to_json(&entry.items)?)
    .bind(&entry.invoice_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(version_conflict(conn, &entry.id).await);
    }

    Ok(entry.version + 1)
}

/// Links an entry to a document, only if it is unlinked and unchanged.
///
/// Returns `false` when the claim did not apply; the caller decides which
/// error that is.
pub(crate) async fn claim_for_invoice(
    conn: &mut SqliteConnection,
    entry: &Entry,
    document_id: &str,
    status: EntryStatus,
) -> DbResult<bool> {
    debug!(id = %entry.id, document_id = %document_id, "Claiming entry for invoice");

    let result = sqlx::query(
        r#"
        UPDATE entries SET
            invoice_id = ?3,
            status = ?4,
            updated_at = ?5,
            version = version + 1
        WHERE id = ?1 AND version = ?2 AND invoice_id IS NULL
        "#,
    )
    .bind(&entry.id)
    .bind(entry.version)
    .bind(document_id)
    .bind(status)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Unlinks an entry from its document and sets `status`, whatever its
/// current state.
pub(crate) async fn release_from_invoice(
    conn: &mut SqliteConnection,
    id: &str,
    status: EntryStatus,
) -> DbResult<bool> {
    debug!(id = %id, "Releasing entry from invoice");

    let result = sqlx::query(
        r#"
        UPDATE entries SET
            invoice_id = NULL,
            status = ?2,
            updated_at = ?3,
            version = version + 1
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting entry");

    let result = sqlx::query("DELETE FROM entries WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Entry", id));
    }
    Ok(())
}

/// Error for a versioned write that matched no row.
pub(crate) async fn version_conflict(conn: &mut SqliteConnection, id: &str) -> DbError {
    match fetch(conn, id).await {
        Ok(Some(_)) => DbError::concurrent("Entry", id),
        Ok(None) => DbError::not_found("Entry", id),
        Err(err) => err,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for entry reads and single-statement writes.
///
/// Multi-step changes (deliveries, invoicing, reversal) go through the
/// [`Reconciler`](crate::engine::Reconciler).
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EntryRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Entry>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Exact, case-sensitive code match.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Entry>> {
        let row = sqlx::query(&format!("SELECT {} FROM entries WHERE code = ?1", ENTRY_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// All entries, newest date first.
    pub async fn list_all(&self) -> DbResult<Vec<Entry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entries ORDER BY date DESC, CAST(code AS INTEGER) DESC",
            ENTRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Entries in any of `statuses`, newest date first.
    pub async fn list_by_statuses(&self, statuses: &[EntryStatus]) -> DbResult<Vec<Entry>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM entries WHERE status IN (", ENTRY_COLUMNS));
        let mut separated = qb.separated(", ");
        for status in statuses {
            separated.push_bind(*status);
        }
        separated.push_unseparated(") ORDER BY date DESC, CAST(code AS INTEGER) DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
