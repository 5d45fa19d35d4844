//! # Document Commands
//!
//! Preview is open to every role. Issuing documents, recording payments
//! and reversing documents need an administrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::IdPayload;
use crate::error::ApiError;
use crate::session::Session;
use crate::state::Workbench;
use atelier_core::invoice::{DocumentDraft, InvoiceRequest};
use atelier_core::totals::DocumentSummary;
use atelier_core::validation::validate_date_range;
use atelier_core::{CoreError, Document, Money, Payment, Role};
use atelier_db::{BulkDeletionReport, DocumentFilter, ReversalReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentPayload {
    pub document_id: String,
    pub amount: Money,
    /// Defaults to now.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentsPayload {
    pub ids: Vec<String>,
}

pub async fn preview_invoice(
    wb: &Workbench,
    request: InvoiceRequest,
) -> Result<DocumentDraft, ApiError> {
    debug!(entries = request.entry_ids.len(), "preview_invoice command");
    Ok(wb.reconciler().preview_invoice(&request).await?)
}

pub async fn generate_invoice(
    wb: &Workbench,
    session: &Session,
    request: InvoiceRequest,
) -> Result<Document, ApiError> {
    debug!(entries = request.entry_ids.len(), "generate_invoice command");
    session.require_role(&[Role::Admin], "GenerateInvoice")?;
    Ok(wb.reconciler().generate_invoice(&request).await?)
}

pub async fn add_payment(
    wb: &Workbench,
    session: &Session,
    payload: AddPaymentPayload,
) -> Result<Document, ApiError> {
    debug!(document_id = %payload.document_id, amount = %payload.amount, "add_payment command");
    session.require_role(&[Role::Admin], "AddPayment")?;

    let payment = Payment {
        amount: payload.amount,
        date: payload.date.unwrap_or_else(Utc::now),
        method: payload.method,
        notes: payload.notes,
    };
    Ok(wb.reconciler().add_payment(&payload.document_id, payment).await?)
}

pub async fn delete_document(
    wb: &Workbench,
    session: &Session,
    payload: IdPayload,
) -> Result<ReversalReport, ApiError> {
    debug!(id = %payload.id, "delete_document command");
    session.require_role(&[Role::Admin], "DeleteDocument")?;
    Ok(wb.reconciler().delete_document(&payload.id).await?)
}

/// Per-document failures are reported in the result, not as an error.
pub async fn delete_documents(
    wb: &Workbench,
    session: &Session,
    payload: DeleteDocumentsPayload,
) -> Result<BulkDeletionReport, ApiError> {
    debug!(count = payload.ids.len(), "delete_documents command");
    session.require_role(&[Role::Admin], "DeleteDocuments")?;
    if payload.ids.is_empty() {
        return Err(ApiError::validation("ids must not be empty"));
    }
    Ok(wb.reconciler().delete_documents(&payload.ids).await)
}

pub async fn list_documents(
    wb: &Workbench,
    filter: DocumentFilter,
) -> Result<Vec<DocumentSummary>, ApiError> {
    debug!(?filter, "list_documents command");
    validate_date_range("dateRange", filter.from, filter.to).map_err(CoreError::from)?;
    Ok(wb.reconciler().list_documents(&filter, Utc::now()).await?)
}
