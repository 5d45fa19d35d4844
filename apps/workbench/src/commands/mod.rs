//! # Workbench Commands
//!
//! Every operation the workbench exposes, as one typed union.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── Command union, dispatch, JSON-line envelope
//! ├── catalog.rs   ◄─── Clients and products
//! ├── entry.rs     ◄─── Entry create/edit/delete and listings
//! ├── delivery.rs  ◄─── Delivery recording
//! └── invoice.rs   ◄─── Preview, generation, payments, reversal, history
//! ```
//!
//! ## Wire Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin   {"id":7,"command":{"type":"DeleteDocument",                    │
//! │                             "payload":{"id":"5b1e..."}}}                │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  Request ──► Session (request user or configured default)               │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  dispatch(Command::DeleteDocument(IdPayload)) ──► role gate ──► engine  │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  stdout  {"id":7,"ok":true,"data":{"documentId":"5b1e...", ...}}        │
//! │     or   {"id":7,"ok":false,"error":{"code":"FORBIDDEN", ...}}          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod delivery;
pub mod entry;
pub mod invoice;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::session::Session;
use crate::state::Workbench;
use atelier_core::invoice::{DocumentDraft, InvoiceRequest};
use atelier_core::entry::NewEntry;
use atelier_core::totals::DocumentSummary;
use atelier_core::{Client, Document, Entry, Product, User};
use atelier_db::{BulkDeletionReport, DeliveryOutcome, DocumentFilter, EntryDetails, ReversalReport};

pub use catalog::{CreateClientPayload, CreateProductPayload, UpdateProductPricePayload};
pub use delivery::RecordDeliveryPayload;
pub use entry::{ListEntriesPayload, ListInvoiceablePayload, UpdateEntryPayload};
pub use invoice::{AddPaymentPayload, DeleteDocumentsPayload};

// =============================================================================
// Command Union
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdPayload {
    pub id: String,
}

/// One workbench operation with its typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    // Catalog
    CreateClient(CreateClientPayload),
    CreateProduct(CreateProductPayload),
    UpdateProductPrice(UpdateProductPricePayload),
    ListClients,
    ListProducts,

    // Entries
    CreateEntry(NewEntry),
    UpdateEntry(UpdateEntryPayload),
    DeleteEntry(IdPayload),
    EntryDetails(IdPayload),
    ListEntries(ListEntriesPayload),
    ListInvoiceable(ListInvoiceablePayload),

    // Deliveries
    RecordDelivery(RecordDeliveryPayload),

    // Documents
    PreviewInvoice(InvoiceRequest),
    GenerateInvoice(InvoiceRequest),
    AddPayment(AddPaymentPayload),
    DeleteDocument(IdPayload),
    DeleteDocuments(DeleteDocumentsPayload),
    ListDocuments(DocumentFilter),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateClient(_) => "CreateClient",
            Command::CreateProduct(_) => "CreateProduct",
            Command::UpdateProductPrice(_) => "UpdateProductPrice",
            Command::ListClients => "ListClients",
            Command::ListProducts => "ListProducts",
            Command::CreateEntry(_) => "CreateEntry",
            Command::UpdateEntry(_) => "UpdateEntry",
            Command::DeleteEntry(_) => "DeleteEntry",
            Command::EntryDetails(_) => "EntryDetails",
            Command::ListEntries(_) => "ListEntries",
            Command::ListInvoiceable(_) => "ListInvoiceable",
            Command::RecordDelivery(_) => "RecordDelivery",
            Command::PreviewInvoice(_) => "PreviewInvoice",
            Command::GenerateInvoice(_) => "GenerateInvoice",
            Command::AddPayment(_) => "AddPayment",
            Command::DeleteDocument(_) => "DeleteDocument",
            Command::DeleteDocuments(_) => "DeleteDocuments",
            Command::ListDocuments(_) => "ListDocuments",
        }
    }
}

/// Successful command result; serialized as the bare value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Client(Client),
    Clients(Vec<Client>),
    Product(Product),
    Products(Vec<Product>),
    Entry(Entry),
    Entries(Vec<Entry>),
    EntryDetails(EntryDetails),
    Deleted(IdPayload),
    Delivery(DeliveryOutcome),
    Draft(DocumentDraft),
    Document(Document),
    Documents(Vec<DocumentSummary>),
    Reversal(ReversalReport),
    BulkDeletion(BulkDeletionReport),
}

/// Runs `command` as `session`.
pub async fn dispatch(
    wb: &Workbench,
    session: &Session,
    command: Command,
) -> Result<Response, ApiError> {
    debug!(command = command.name(), user = %session.user.id, "dispatch");

    match command {
        Command::CreateClient(p) => catalog::create_client(wb, p).await.map(Response::Client),
        Command::CreateProduct(p) => catalog::create_product(wb, p).await.map(Response::Product),
        Command::UpdateProductPrice(p) => {
            catalog::update_product_price(wb, session, p).await.map(Response::Product)
        }
        Command::ListClients => catalog::list_clients(wb).await.map(Response::Clients),
        Command::ListProducts => catalog::list_products(wb).await.map(Response::Products),

        Command::CreateEntry(p) => entry::create_entry(wb, session, p).await.map(Response::Entry),
        Command::UpdateEntry(p) => entry::update_entry(wb, session, p).await.map(Response::Entry),
        Command::DeleteEntry(p) => entry::delete_entry(wb, p).await.map(Response::Deleted),
        Command::EntryDetails(p) => entry::entry_details(wb, p).await.map(Response::EntryDetails),
        Command::ListEntries(p) => entry::list_entries(wb, p).await.map(Response::Entries),
        Command::ListInvoiceable(p) => entry::list_invoiceable(wb, p).await.map(Response::Entries),

        Command::RecordDelivery(p) => {
            delivery::record_delivery(wb, session, p).await.map(Response::Delivery)
        }

        Command::PreviewInvoice(p) => invoice::preview_invoice(wb, p).await.map(Response::Draft),
        Command::GenerateInvoice(p) => {
            invoice::generate_invoice(wb, session, p).await.map(Response::Document)
        }
        Command::AddPayment(p) => invoice::add_payment(wb, session, p).await.map(Response::Document),
        Command::DeleteDocument(p) => {
            invoice::delete_document(wb, session, p).await.map(Response::Reversal)
        }
        Command::DeleteDocuments(p) => {
            invoice::delete_documents(wb, session, p).await.map(Response::BulkDeletion)
        }
        Command::ListDocuments(p) => invoice::list_documents(wb, p).await.map(Response::Documents),
    }
}

// =============================================================================
// JSON-line Envelope
// =============================================================================

/// One input line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Echoed back unchanged so callers can match replies.
    #[serde(default)]
    pub id: Option<Value>,
    /// Acts as this user instead of the configured default.
    ///
    /// The user is taken as given: role gates trust whoever writes to the
    /// workbench's stdin, which is expected to be a local, already
    /// authenticated front end.
    #[serde(default)]
    pub user: Option<User>,
    pub command: Command,
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Reply {
    fn from_result(id: Option<Value>, result: Result<Response, ApiError>) -> Self {
        match result {
            Ok(data) => Reply {
                id,
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Reply {
                id,
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Parses one request line, runs it and renders the reply line.
///
/// A request carrying `user` runs under that user's role without further
/// checks; see [`Request::user`].
pub async fn handle_line(wb: &Workbench, default_session: &Session, line: &str) -> String {
    let reply = match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            let session = match request.user {
                Some(user) => {
                    debug!(user = %user.id, role = ?user.role, "Request acts as its own user");
                    Session::new(user)
                }
                None => default_session.clone(),
            };
            let result = dispatch(wb, &session, request.command).await;
            Reply::from_result(request.id, result)
        }
        Err(e) => {
            debug!(error = %e, "Malformed request");
            Reply::from_result(None, Err(ApiError::validation(format!("Malformed request: {}", e))))
        }
    };

    serde_json::to_string(&reply).unwrap_or_else(|e| {
        tracing::error!("Reply could not be serialized: {}", e);
        r#"{"id":null,"ok":false,"error":{"code":"INTERNAL","message":"Reply could not be serialized"}}"#
            .to_string()
    })
}
