//! # Product Repository
//!
//! The catalog, as seen by entry creation and invoice generation.
//!
//! ## Needs-Pricing Products
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price_cents = 0  →  "needs pricing"                                   │
//! │                                                                         │
//! │  POL-001 | Polo Classic | 5.00  ← billed                               │
//! │  CAM-NEW | New Product  | 0.00  ← accepted on entries, never billed    │
//! │                                                                         │
//! │  Pricing the product later makes past deliveries billable.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use atelier_core::{Money, Product};

const PRODUCT_COLUMNS: &str =
    "id, code, reference, model_name, price_cents, category, description, client_id";

fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        reference: row.try_get("reference")?,
        model_name: row.try_get("model_name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        client_id: row.try_get("client_id")?,
    })
}

/// The whole catalog, for lookups by id or reference.
pub(crate) async fn fetch_all(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM products ORDER BY reference COLLATE NOCASE",
        PRODUCT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(product_from_row).collect()
}

pub(crate) async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, reference = %product.reference, "Inserting product");

    if product.price.is_negative() {
        return Err(DbError::QueryFailed(format!(
            "product {} has a negative price",
            product.reference
        )));
    }

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO products (
            id, code, reference, model_name, price_cents,
            category, description, client_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(&product.id)
    .bind(&product.code)
    .bind(&product.reference)
    .bind(&product.model_name)
    .bind(product.price.cents())
    .bind(&product.category)
    .bind(&product.description)
    .bind(&product.client_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    /// Case-insensitive lookup by reference.
    pub async fn get_by_reference(&self, reference: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE reference = ?1 COLLATE NOCASE LIMIT 1",
            PRODUCT_COLUMNS
        ))
        .bind(reference.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    /// Products of one client, plus those shared by every client.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE client_id = ?1 OR client_id IS NULL ORDER BY reference COLLATE NOCASE",
            PRODUCT_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    /// Products with a zero price.
    pub async fn list_needing_price(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE price_cents = 0 ORDER BY reference COLLATE NOCASE",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, product).await
    }

    /// Sets a product's price. Documents already issued keep their snapshot.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        debug!(id = %id, price = %price, "Updating product price");

        if price.is_negative() {
            return Err(DbError::QueryFailed("price must not be negative".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET price_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
