use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub wholesale_price: Option<f64>,
    pub sale_price: f64,
    pub stock: i32,
    pub category: String,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub discount_amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub sale_date: DateTime<Utc>,
    pub invoice_number: String,
    pub order_status: String,
    pub payment_status: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a sale. Name and unit price are snapshots taken at sale time,
/// immune to later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subscriber {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub address_city: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address_detail: Option<String>,
    pub tax_number: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub whatsapp_enabled: bool,
    pub subscription_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
