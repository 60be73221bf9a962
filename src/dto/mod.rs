pub mod customers;
pub mod dashboard;
pub mod products;
pub mod sales;
pub mod subscribers;
pub mod whatsapp;
