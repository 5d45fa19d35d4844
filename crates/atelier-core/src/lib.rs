//! # atelier-core: Pure Reconciliation Logic for Atelier
//!
//! Entries (client orders by size), partial deliveries against them, and
//! the invoices generated from what was delivered.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atelier Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Workbench (JSON-line commands)                  │   │
//! │  │   CreateEntry, RecordDelivery, GenerateInvoice, DeleteDocument  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    atelier-db (Reconciler)                      │   │
//! │  │        one transaction per operation, optimistic versions       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atelier-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ledger ──► aggregate ──► status                               │   │
//! │  │                  │                                              │   │
//! │  │                  └──► invoice ──► totals ──► reversal           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOGGING • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ledger`] - Quantity-by-size maps
//! - [`aggregate`] - Deliveries folded into delivered/pending quantities
//! - [`status`] - Entry state machine
//! - [`entry`], [`delivery`] - Authoritative write-path checks
//! - [`invoice`] - Document lines and surcharges
//! - [`totals`] - Tax, totals and the payment ledger
//! - [`reversal`] - Undoing a document
//! - [`money`] - Integer cents and basis-point rates
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::money::Money;
//!
//! let subtotal = Money::from_cents(10_000); // 100.00
//! let tax = subtotal.percent_of(atelier_core::DEFAULT_TAX_RATE);
//! assert_eq!(tax.cents(), 2_100);
//! assert_eq!((subtotal + tax).to_string(), "121.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod catalog;
pub mod delivery;
pub mod entry;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod reversal;
pub mod status;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::EntryAggregate;
pub use catalog::ProductCatalog;
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::SizeQuantities;
pub use money::{Money, Rate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lines with at most this many delivered units are surcharged for the
/// special client. Fixed by the client agreement.
pub const SPECIAL_CLIENT_SURCHARGE_THRESHOLD: i64 = 20;

/// Special-client small-quantity surcharge: 10%.
pub const SPECIAL_CLIENT_SURCHARGE_RATE: Rate = Rate::from_bps(1000);

/// Invoice tax rate unless configured otherwise: 21%.
pub const DEFAULT_TAX_RATE: Rate = Rate::from_bps(2100);

/// Unpaid documents become overdue this many days after their date.
pub const OVERDUE_AFTER_DAYS: i64 = 30;

/// Name of the client that gets the special surcharge rule.
pub const DEFAULT_SPECIAL_CLIENT_NAME: &str = "AUSTRAL SPORT S.A.";
