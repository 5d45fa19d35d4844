//! # Atelier Workbench Library
//!
//! The command layer over the reconciliation engine. The binary feeds it
//! one JSON request per stdin line; tests drive it directly.
//!
//! ## Module Organization
//! ```text
//! atelier_workbench/
//! ├── lib.rs          ◄─── You are here (exports, logging setup)
//! ├── config.rs       ◄─── ATELIER_* environment configuration
//! ├── state.rs        ◄─── Database + Reconciler + config
//! ├── session.rs      ◄─── Acting user and role gates
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command union, dispatch, JSON-line envelope
//! │   ├── catalog.rs  ◄─── Clients, products
//! │   ├── entry.rs    ◄─── Entries and listings
//! │   ├── delivery.rs ◄─── Delivery recording
//! │   └── invoice.rs  ◄─── Documents, payments, reversal
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use commands::{dispatch, handle_line, Command, Reply, Request, Response};
pub use config::{ConfigError, WorkbenchConfig};
pub use error::{ApiError, ErrorCode};
pub use session::Session;
pub use state::Workbench;

/// Initializes logging to stderr; stdout carries replies only.
///
/// Default filter is `info`, overridden by `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
