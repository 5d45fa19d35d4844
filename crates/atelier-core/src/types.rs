//! # Domain Types
//!
//! Records shared by every layer of Atelier.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Entry       │   │    Delivery     │   │    Document     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  entry_code     │   │  document_number│       │
//! │  │  code (business)│   │  delivery_date  │   │  entry_ids ─────┼──► Entry.id
//! │  │  status         │   │  items[]        │   │  items[] (snap) │       │
//! │  │  items[]        │   └─────────────────┘   │  payments[]     │       │
//! │  │  invoice_id ────┼──────────────────────►  └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an opaque `id` used for relations. Entries also carry a
//! human-assigned `code`; deliveries reference entries by that code, not by
//! id, and matching is exact string equality.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::SizeQuantities;
use crate::money::{Money, Rate};

// =============================================================================
// Roles
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    /// Privileged roles may override entry status and issue or delete documents.
    pub const fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The person acting on the system; `full_name` is stamped on entries and
/// deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub role: Role,
}

// =============================================================================
// Client & Product
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    /// Also used to recognise the special client (exact match).
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub vat_number: String,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub code: String,
    pub reference: String,
    pub model_name: String,
    /// Unit price. Zero means "needs pricing" and is never billed.
    pub price: Money,
    pub category: String,
    pub description: String,
    pub client_id: Option<String>,
}

impl Product {
    /// Whether the product can appear on a document.
    #[inline]
    pub fn is_priced(&self) -> bool {
        self.price.is_positive()
    }
}

// =============================================================================
// Entry Status
// =============================================================================

/// Lifecycle state of an entry. See [`crate::status`] for the transitions.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Received,
    InProcess,
    Delivered,
    PreInvoiced,
    Invoiced,
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Received
    }
}

impl EntryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Received => "received",
            EntryStatus::InProcess => "in_process",
            EntryStatus::Delivered => "delivered",
            EntryStatus::PreInvoiced => "pre_invoiced",
            EntryStatus::Invoiced => "invoiced",
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// One line of an entry: a product ordered in several sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntryItem {
    pub id: String,
    pub product_id: String,
    pub product_ref: String,
    pub description: String,
    /// Ordered quantity per size.
    pub size_quantities: SizeQuantities,
    #[serde(default)]
    pub optional_ref1: Option<String>,
    #[serde(default)]
    pub optional_ref2: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl EntryItem {
    #[inline]
    pub fn ordered_units(&self) -> i64 {
        self.size_quantities.total_units()
    }
}

/// A client order batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    /// Sequential numeric string, unique.
    pub code: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub client_id: String,
    pub who_input: String,
    pub status: EntryStatus,
    pub items: Vec<EntryItem>,
    /// Document currently reconciling this entry. Set means locked.
    pub invoice_id: Option<String>,
    /// Optimistic concurrency token, bumped on every write.
    #[serde(default)]
    pub version: i64,
}

impl Entry {
    /// An entry linked to a document accepts no deliveries and cannot be
    /// invoiced again until the document is deleted.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.invoice_id.is_some()
    }

    pub fn item(&self, entry_item_id: &str) -> Option<&EntryItem> {
        self.items.iter().find(|item| item.id == entry_item_id)
    }

    pub fn total_ordered(&self) -> i64 {
        self.items.iter().map(EntryItem::ordered_units).sum()
    }
}

// =============================================================================
// Delivery
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    pub entry_id: String,
    /// References `EntryItem::id`.
    pub entry_item_id: String,
    pub product_id: String,
    pub size_quantities: SizeQuantities,
}

/// A partial or complete fulfillment event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    /// References `Entry::code` (exact match), not `Entry::id`.
    pub entry_code: String,
    #[ts(as = "String")]
    pub delivery_date: DateTime<Utc>,
    pub who_delivered: String,
    pub items: Vec<DeliveryItem>,
}

// =============================================================================
// Document
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DocumentType {
    Prefactura,
    Factura,
}

impl DocumentType {
    /// Prefix of the document number (`PR-0001`, `FA-0001`).
    pub const fn number_prefix(&self) -> &'static str {
        match self {
            DocumentType::Prefactura => "PR",
            DocumentType::Factura => "FA",
        }
    }
}

/// Stored billing state, set at creation and on each payment.
///
/// The richer reporting state (with `Overdue`) is [`DerivedPaymentStatus`],
/// computed at read time and never written back.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DerivedPaymentStatus {
    Paid,
    Pending,
    Overdue,
}

/// A priced line of a document, frozen at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub product_id: String,
    pub description: String,
    pub unit_price: Money,
    pub total: Money,
    pub entry_code: String,
    pub reference: String,
    pub ordered_qty: i64,
    pub delivered_qty: i64,
    pub pending_qty: i64,
    #[ts(as = "Option<String>")]
    pub last_delivery_date: Option<DateTime<Utc>>,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Surcharge {
    pub reason: String,
    pub amount: Money,
}

/// A payment towards a document. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: Money,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An invoice (Factura) or pre-invoice (Prefactura).
///
/// Immutable after creation except for `payments` and `payment_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub document_number: String,
    pub document_type: DocumentType,
    pub client_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Exactly the entries reconciled into this document.
    pub entry_ids: Vec<String>,
    pub items: Vec<DocumentItem>,
    pub subtotal: Money,
    pub surcharges: Vec<Surcharge>,
    pub tax_rate: Rate,
    pub tax_amount: Money,
    pub total: Money,
    pub payment_status: PaymentStatus,
    pub payments: Vec<Payment>,
    #[ts(as = "Option<String>")]
    pub invoice_period_start: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub invoice_period_end: Option<NaiveDate>,
}

// =============================================================================
// Unit Tests
// =============================================================================
