//! # Delivery Commands

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::session::Session;
use crate::state::Workbench;
use atelier_core::delivery::{DeliveryInput, DeliveryItemInput};
use atelier_db::DeliveryOutcome;

/// Delivery form submission. The deliverer is the session user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDeliveryPayload {
    pub entry_id: String,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
    pub items: Vec<DeliveryItemInput>,
}

pub async fn record_delivery(
    wb: &Workbench,
    session: &Session,
    payload: RecordDeliveryPayload,
) -> Result<DeliveryOutcome, ApiError> {
    debug!(entry_id = %payload.entry_id, items = payload.items.len(), "record_delivery command");

    let input = DeliveryInput {
        entry_id: payload.entry_id,
        delivery_date: payload.delivery_date,
        who_delivered: session.who().to_string(),
        items: payload.items,
    };
    Ok(wb.reconciler().record_delivery(&input).await?)
}
