use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub wholesale_price: Option<f64>,
    pub sale_price: f64,
    pub stock: i32,
    pub category: String,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

// Sale items reference products by a nullable id on purpose: deleting a
// product must not touch recorded sales, so no relation is declared.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
