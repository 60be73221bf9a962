pub mod customers;
pub mod products;
pub mod sale_items;
pub mod sales;
pub mod subscribers;
pub mod whatsapp_messages;
