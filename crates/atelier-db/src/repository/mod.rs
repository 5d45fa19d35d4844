//! # Repository Module
//!
//! Database repository implementations for Atelier.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two ways into the same SQL                           │
//! │                                                                         │
//! │  db.entries().get_by_id(id)          Reconciler (inside a transaction)  │
//! │       │                                   │                             │
//! │       │ acquire pooled connection         │ &mut *tx                    │
//! │       ▼                                   ▼                             │
//! │  entry::fetch(&mut conn, id)  ◄───────────┘                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every statement is a free function over `&mut SqliteConnection`, so the
//! engine can run several of them in one transaction without taking a
//! second connection from the pool. The repository structs wrap the same
//! functions for one-off reads and writes.
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`](client::ClientRepository) - Client registry
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - [`EntryRepository`](entry::EntryRepository) - Entries and their versions
//! - [`DeliveryRepository`](delivery::DeliveryRepository) - Append-only deliveries
//! - [`DocumentRepository`](document::DocumentRepository) - Invoices and payments

pub mod client;
pub mod delivery;
pub mod document;
pub mod entry;
pub mod product;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DbResult;

/// Encodes a JSON column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a JSON column.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> DbResult<T> {
    Ok(serde_json::from_str(raw)?)
}
