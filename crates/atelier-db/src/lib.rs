//! # atelier-db: Database Layer for Atelier
//!
//! SQLite storage for clients, products, entries, deliveries and documents,
//! and the [`Reconciler`] that runs every multi-row change as a single
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Atelier Data Flow                               │
//! │                                                                         │
//! │  Workbench command (RecordDelivery)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    atelier-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Reconciler   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (engine.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ transactions  │    │ 001_initial  │  │   │
//! │  │   │ Repositories  │    │ + core rules  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table reads and statements
//! - [`engine`] - Transactional reconciliation operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_db::{Database, DbConfig, ReconcilerConfig};
//!
//! let db = Database::new(DbConfig::new("./atelier.db")).await?;
//! let reconciler = db.reconciler(ReconcilerConfig::default());
//!
//! let outcome = reconciler.record_delivery(&input).await?;
//! let document = reconciler.generate_invoice(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{
    BulkDeletionReport, BulkFailure, DeliveryOutcome, DocumentFilter, EntryDetails, Reconciler,
    ReconcilerConfig, ReversalReport,
};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::delivery::DeliveryRepository;
pub use repository::document::{DocumentQuery, DocumentRepository};
pub use repository::entry::EntryRepository;
pub use repository::product::ProductRepository;
