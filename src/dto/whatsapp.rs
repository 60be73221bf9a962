use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Bulk send to the tag-filtered subscriber segment. `body` is the approved
/// template text with `{{key}}` placeholders; per-subscriber fields (name,
/// city, company) are merged into `parameters` before rendering.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkSendRequest {
    pub template_name: String,
    pub language: Option<String>,
    pub body: String,
    pub parameters: Option<HashMap<String, String>>,
    /// Empty or absent means every active, WhatsApp-enabled subscriber.
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TestSendRequest {
    pub phone: String,
    pub template_name: String,
    pub language: Option<String>,
    pub body: String,
    pub parameters: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub failed_recipients: Vec<String>,
}
