//! # Catalog Commands
//!
//! Clients and products referenced by entries.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::Session;
use crate::state::Workbench;
use atelier_core::validation::validate_required;
use atelier_core::{Client, CoreError, Money, Product, Role};
use atelier_db::repository::product::generate_product_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vat_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    /// Internal catalog code; defaults to the reference.
    #[serde(default)]
    pub code: Option<String>,
    pub reference: String,
    pub model_name: String,
    /// Zero marks the product as still needing a price.
    #[serde(default)]
    pub price: Money,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Restricts the product to one client.
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPricePayload {
    pub id: String,
    pub price: Money,
}

pub async fn create_client(wb: &Workbench, payload: CreateClientPayload) -> Result<Client, ApiError> {
    debug!("create_client command");
    validate_required("name", &payload.name).map_err(CoreError::from)?;

    let client = Client {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        address: payload.address,
        email: payload.email,
        phone: payload.phone,
        vat_number: payload.vat_number,
    };
    wb.db().clients().insert(&client).await?;

    info!(client_id = %client.id, name = %client.name, "Client created");
    Ok(client)
}

pub async fn create_product(
    wb: &Workbench,
    payload: CreateProductPayload,
) -> Result<Product, ApiError> {
    debug!("create_product command");
    validate_required("reference", &payload.reference).map_err(CoreError::from)?;
    if payload.price.is_negative() {
        return Err(ApiError::validation("price must not be negative"));
    }

    let reference = payload.reference.trim().to_string();
    let product = Product {
        id: generate_product_id(),
        code: payload.code.unwrap_or_else(|| reference.clone()),
        reference,
        model_name: payload.model_name,
        price: payload.price,
        category: payload.category,
        description: payload.description,
        client_id: payload.client_id,
    };
    wb.db().products().insert(&product).await?;

    info!(product_id = %product.id, reference = %product.reference, "Product created");
    Ok(product)
}

/// Admin only. Issued documents keep the price they were generated with.
pub async fn update_product_price(
    wb: &Workbench,
    session: &Session,
    payload: UpdateProductPricePayload,
) -> Result<Product, ApiError> {
    debug!("update_product_price command");
    session.require_role(&[Role::Admin], "UpdateProductPrice")?;
    if payload.price.is_negative() {
        return Err(ApiError::validation("price must not be negative"));
    }

    let products = wb.db().products();
    products.update_price(&payload.id, payload.price).await?;
    products
        .get_by_id(&payload.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &payload.id))
}

pub async fn list_clients(wb: &Workbench) -> Result<Vec<Client>, ApiError> {
    debug!("list_clients command");
    Ok(wb.db().clients().list().await?)
}

pub async fn list_products(wb: &Workbench) -> Result<Vec<Product>, ApiError> {
    debug!("list_products command");
    Ok(wb.db().products().list_all().await?)
}
