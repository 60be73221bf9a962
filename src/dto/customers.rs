use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Customer;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<Customer>,
}
