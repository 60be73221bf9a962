use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "whatsapp_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub template_name: String,
    pub recipient: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub parameters: Json,
    pub content: String,
    pub status: String,
    pub error: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
