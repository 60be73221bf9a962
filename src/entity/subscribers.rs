use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscribers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub phone: String,
    pub name: String,
    pub address_city: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address_detail: Option<String>,
    pub tax_number: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    pub notes: Option<String>,
    pub active: bool,
    pub whatsapp_enabled: bool,
    pub subscription_date: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
