//! # Entry Commands

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::IdPayload;
use crate::error::ApiError;
use crate::session::Session;
use crate::state::Workbench;
use atelier_core::entry::{EntryChanges, NewEntry};
use atelier_core::status::StatusGroup;
use atelier_core::validation::validate_date_range;
use atelier_core::{CoreError, Entry};
use atelier_db::EntryDetails;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryPayload {
    pub id: String,
    pub changes: EntryChanges,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesPayload {
    pub group: StatusGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoiceablePayload {
    pub client_id: String,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

/// Records a new entry; `whoInput` is the session user.
pub async fn create_entry(
    wb: &Workbench,
    session: &Session,
    payload: NewEntry,
) -> Result<Entry, ApiError> {
    debug!(client_id = %payload.client_id, items = payload.items.len(), "create_entry command");
    Ok(wb.reconciler().create_entry(&payload, session.who()).await?)
}

/// Status overrides inside `changes` are checked against the session role.
pub async fn update_entry(
    wb: &Workbench,
    session: &Session,
    payload: UpdateEntryPayload,
) -> Result<Entry, ApiError> {
    debug!(id = %payload.id, "update_entry command");
    Ok(wb
        .reconciler()
        .update_entry(&payload.id, &payload.changes, session.role())
        .await?)
}

pub async fn delete_entry(wb: &Workbench, payload: IdPayload) -> Result<IdPayload, ApiError> {
    debug!(id = %payload.id, "delete_entry command");
    wb.reconciler().delete_entry(&payload.id).await?;
    Ok(payload)
}

pub async fn entry_details(wb: &Workbench, payload: IdPayload) -> Result<EntryDetails, ApiError> {
    debug!(id = %payload.id, "entry_details command");
    Ok(wb.reconciler().entry_details(&payload.id).await?)
}

pub async fn list_entries(wb: &Workbench, payload: ListEntriesPayload) -> Result<Vec<Entry>, ApiError> {
    debug!(group = ?payload.group, "list_entries command");
    Ok(wb.reconciler().list_entries(payload.group).await?)
}

pub async fn list_invoiceable(
    wb: &Workbench,
    payload: ListInvoiceablePayload,
) -> Result<Vec<Entry>, ApiError> {
    debug!(client_id = %payload.client_id, "list_invoiceable command");
    validate_date_range("dateRange", payload.from, payload.to).map_err(CoreError::from)?;
    Ok(wb
        .reconciler()
        .list_invoiceable(&payload.client_id, payload.from, payload.to)
        .await?)
}
