use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Sale, SaleItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaleItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSaleRequest {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<SaleItemInput>,
    pub discount_amount: Option<f64>,
    /// Percentage; defaults to 18.
    pub tax_rate: Option<f64>,
    pub payment_method: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
    pub notes: Option<String>,
}

/// PUT replaces the sale: lines are re-snapshotted against current catalog
/// prices and stock is reconciled against the previous lines.
pub type UpdateSaleRequest = CreateSaleRequest;

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Serialize, ToSchema)]
pub struct SaleList {
    pub items: Vec<Sale>,
}
