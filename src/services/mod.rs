pub mod customer_service;
pub mod dashboard_service;
pub mod product_service;
pub mod sale_service;
pub mod subscriber_service;
pub mod whatsapp_service;
