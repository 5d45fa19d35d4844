//! # Delivery Repository
//!
//! Deliveries are append-only. They point at their entry by code, so a
//! lookup is an exact match on `entry_code`.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{from_json, to_json};
use atelier_core::{Delivery, DeliveryItem};

const DELIVERY_COLUMNS: &str = "id, entry_code, delivery_date, who_delivered, items_json";

fn delivery_from_row(row: &SqliteRow) -> DbResult<Delivery> {
    let items_json: String = row.try_get("items_json")?;
    let items: Vec<DeliveryItem> = from_json(&items_json)?;
    Ok(Delivery {
        id: row.try_get("id")?,
        entry_code: row.try_get("entry_code")?,
        delivery_date: row.try_get("delivery_date")?,
        who_delivered: row.try_get("who_delivered")?,
        items,
    })
}

pub(crate) async fn insert(conn: &mut SqliteConnection, delivery: &Delivery) -> DbResult<()> {
    debug!(
        id = %delivery.id,
        entry_code = %delivery.entry_code,
        items = delivery.items.len(),
        "Inserting delivery"
    );

    sqlx::query(
        r#"
        INSERT INTO deliveries (id, entry_code, delivery_date, who_delivered, items_json, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&delivery.id)
    .bind(&delivery.entry_code)
    .bind(delivery.delivery_date)
    .bind(&delivery.who_delivered)
    .bind(to_json(&delivery.items)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deliveries of one entry, oldest first.
pub(crate) async fn fetch_for_code(conn: &mut SqliteConnection, entry_code: &str) -> DbResult<Vec<Delivery>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM deliveries WHERE entry_code = ?1 ORDER BY delivery_date ASC, created_at ASC",
        DELIVERY_COLUMNS
    ))
    .bind(entry_code)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(delivery_from_row).collect()
}

/// Deliveries of several entries, oldest first.
pub(crate) async fn fetch_for_codes(conn: &mut SqliteConnection, entry_codes: &[String]) -> DbResult<Vec<Delivery>> {
    if entry_codes.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM deliveries WHERE entry_code IN (",
        DELIVERY_COLUMNS
    ));
    let mut separated = qb.separated(", ");
    for code in entry_codes {
        separated.push_bind(code);
    }
    separated.push_unseparated(") ORDER BY delivery_date ASC, created_at ASC");

    let rows = qb.build().fetch_all(&mut *conn).await?;
    rows.iter().map(delivery_from_row).collect()
}

/// Repository for delivery reads.
///
/// Recording a delivery also moves its entry's status, so writes go through
/// [`Reconciler::record_delivery`](crate::engine::Reconciler::record_delivery).
#[derive(Debug, Clone)]
pub struct DeliveryRepository {
    pool: SqlitePool,
}

impl DeliveryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DeliveryRepository { pool }
    }

    pub async fn list_for_entry_code(&self, entry_code: &str) -> DbResult<Vec<Delivery>> {
        let mut conn = self.pool.acquire().await?;
        fetch_for_code(&mut conn, entry_code).await
    }

    /// Every delivery, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Delivery>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM deliveries ORDER BY delivery_date DESC, created_at DESC",
            DELIVERY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(delivery_from_row).collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deliveries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
