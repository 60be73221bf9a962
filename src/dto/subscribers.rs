use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Subscriber;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriberRequest {
    pub phone: String,
    pub name: String,
    pub address_city: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address_detail: Option<String>,
    pub tax_number: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub whatsapp_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubscriberRequest {
    pub phone: Option<String>,
    pub name: Option<String>,
    pub address_city: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address_detail: Option<String>,
    pub tax_number: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub active: Option<bool>,
    pub whatsapp_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TagAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkTagRequest {
    pub ids: Vec<Uuid>,
    pub tags: Vec<String>,
    pub action: TagAction,
}

#[derive(Serialize, ToSchema)]
pub struct SubscriberList {
    pub items: Vec<Subscriber>,
}
