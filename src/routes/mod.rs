use axum::Router;

use crate::state::AppState;

pub mod customers;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod newsletters;
pub mod params;
pub mod products;
pub mod sales;
pub mod whatsapp;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/customers", customers::router())
        .nest("/sales", sales::router())
        .nest("/newsletters", newsletters::router())
        .nest("/whatsapp", whatsapp::router())
        .nest("/dashboard", dashboard::router())
}
