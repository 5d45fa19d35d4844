//! # Entry Lifecycle
//!
//! Building and editing entries from form input.
//!
//! ```text
//!   NewEntry ──create_entry──► Entry { status: Received, code: next }
//!                                 │
//!   EntryChanges ──apply_changes──┤  locked entries: date only
//!                                 ▼
//!                              Entry { version unchanged; storage bumps it }
//! ```
//!
//! Item ids are supplied by the caller through `new_id` so this crate stays
//! free of randomness.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::ProductCatalog;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::SizeQuantities;
use crate::status::apply_manual_override;
use crate::types::{Entry, EntryItem, EntryStatus, Role};
use crate::validation::{validate_max_len, validate_required, MAX_TEXT_LEN};

/// One item line of the entry form.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntryItemInput {
    /// Present when editing an existing item.
    #[serde(default)]
    pub id: Option<String>,
    /// Empty means "resolve from `product_ref`".
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_ref: String,
    #[serde(default)]
    pub description: String,
    pub size_quantities: SizeQuantities,
    #[serde(default)]
    pub optional_ref1: Option<String>,
    #[serde(default)]
    pub optional_ref2: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub client_id: String,
    pub items: Vec<EntryItemInput>,
}

/// Edit form submission. `None` leaves the field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntryChanges {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<EntryItemInput>>,
    #[serde(default)]
    pub status: Option<EntryStatus>,
}

/// Turns form items into stored items.
///
/// Each item must name a product, by id or by reference, that exists in
/// the catalog, and must order at least one unit. Non-positive sizes are
/// dropped; sizes above [`MAX_SIZE_QUANTITY`](crate::ledger::MAX_SIZE_QUANTITY)
/// are rejected.
pub fn resolve_items<C, F>(
    inputs: &[EntryItemInput],
    catalog: &C,
    new_id: &mut F,
) -> CoreResult<Vec<EntryItem>>
where
    C: ProductCatalog + ?Sized,
    F: FnMut() -> String,
{
    if inputs.is_empty() {
        return Err(ValidationError::required("items").into());
    }

    inputs
        .iter()
        .map(|input| -> CoreResult<EntryItem> {
            let product = if input.product_id.trim().is_empty() {
                if input.product_ref.trim().is_empty() {
                    return Err(ValidationError::required("productRef").into());
                }
                catalog
                    .product_by_reference(&input.product_ref)
                    .ok_or_else(|| ValidationError::InvalidFormat {
                        field: "productRef".to_string(),
                        reason: format!("no product with reference {}", input.product_ref.trim()),
                    })?
            } else {
                catalog
                    .product(&input.product_id)
                    .ok_or_else(|| CoreError::not_found("Product", input.product_id.as_str()))?
            };

            validate_max_len("description", &input.description, MAX_TEXT_LEN)?;
            input.size_quantities.validate_quantities("sizeQuantities")?;
            let sizes = input.size_quantities.cleaned();
            let units = sizes.checked_total_units().ok_or_else(|| CoreError::Overflow {
                context: "ordered units".to_string(),
            })?;
            if units <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "sizeQuantities".to_string(),
                }
                .into());
            }

            Ok(EntryItem {
                id: input
                    .id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| new_id()),
                product_id: product.id.clone(),
                product_ref: product.reference.clone(),
                description: if input.description.trim().is_empty() {
                    product.model_name.clone()
                } else {
                    input.description.trim().to_string()
                },
                size_quantities: sizes,
                optional_ref1: input.optional_ref1.clone(),
                optional_ref2: input.optional_ref2.clone(),
                image_url: input.image_url.clone(),
            })
        })
        .collect()
}

/// Builds a new entry in status `Received`.
pub fn create_entry<C, F>(
    input: &NewEntry,
    id: String,
    code: String,
    who_input: &str,
    catalog: &C,
    new_id: &mut F,
) -> CoreResult<Entry>
where
    C: ProductCatalog + ?Sized,
    F: FnMut() -> String,
{
    validate_required("clientId", &input.client_id)?;
    validate_required("whoInput", who_input)?;
    let items = resolve_items(&input.items, catalog, new_id)?;

    Ok(Entry {
        id,
        code,
        date: input.date,
        client_id: input.client_id.trim().to_string(),
        who_input: who_input.trim().to_string(),
        status: EntryStatus::Received,
        items,
        invoice_id: None,
        version: 0,
    })
}

/// Applies an edit to a copy of `entry`.
///
/// A locked entry keeps its client, items and status. Status changes
/// follow the manual override rule.
pub fn apply_changes<C, F>(
    entry: &Entry,
    changes: &EntryChanges,
    role: Role,
    catalog: &C,
    new_id: &mut F,
) -> CoreResult<Entry>
where
    C: ProductCatalog + ?Sized,
    F: FnMut() -> String,
{
    let mut updated = entry.clone();

    let touches_lines = changes
        .client_id
        .as_ref()
        .is_some_and(|c| c.trim() != entry.client_id)
        || changes.items.is_some()
        || changes.status.is_some_and(|s| s != entry.status);
    if touches_lines {
        if let Some(invoice_id) = &entry.invoice_id {
            return Err(CoreError::EntryLocked {
                entry_code: entry.code.clone(),
                invoice_id: invoice_id.clone(),
            });
        }
    }

    if let Some(date) = changes.date {
        updated.date = date;
    }
    if let Some(client_id) = &changes.client_id {
        validate_required("clientId", client_id)?;
        updated.client_id = client_id.trim().to_string();
    }
    if let Some(items) = &changes.items {
        updated.items = resolve_items(items, catalog, new_id)?;
    }
    if let Some(status) = changes.status {
        updated.status = apply_manual_override(entry, status, role)?;
    }

    Ok(updated)
}

// =============================================================================
// Unit Tests
// =============================================================================
