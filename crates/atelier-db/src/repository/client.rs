//! # Client Repository
//!
//! The client registry. Only what reconciliation needs: lookup by id and
//! the name used to recognise the special client.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use atelier_core::Client;

const CLIENT_COLUMNS: &str = "id, name, address, email, phone, vat_number";

fn client_from_row(row: &SqliteRow) -> DbResult<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        vat_number: row.try_get("vat_number")?,
    })
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Client>> {
    let row = sqlx::query(&format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(client_from_row).transpose()
}

pub(crate) async fn insert(conn: &mut SqliteConnection, client: &Client) -> DbResult<()> {
    debug!(id = %client.id, name = %client.name, "Inserting client");

    sqlx::query(
        r#"
        INSERT INTO clients (id, name, address, email, phone, vat_number, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&client.id)
    .bind(&client.name)
    .bind(&client.address)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.vat_number)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing client is an error.
    pub async fn require(&self, id: &str) -> DbResult<Client> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, client).await
    }

    /// All clients, by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM clients ORDER BY name COLLATE NOCASE",
            CLIENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(client_from_row).collect()
    }
}
