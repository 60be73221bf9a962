use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub wholesale_price: Option<f64>,
    pub sale_price: f64,
    pub stock: Option<i32>,
    pub category: String,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub wholesale_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    Increase,
    Decrease,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockAdjustRequest {
    pub action: StockAction,
    pub quantity: i32,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
