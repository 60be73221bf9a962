use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, ProductList, StockAction, StockAdjustRequest, UpdateProductRequest,
    },
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, ProductQuery, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern.clone()))
                .add(Expr::col(Column::Sku).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(Column::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_required(&payload.name, &payload.category)?;
    validate_amounts(
        Some(payload.sale_price),
        payload.wholesale_price,
        payload.stock,
    )?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        wholesale_price: Set(payload.wholesale_price),
        sale_price: Set(payload.sale_price),
        stock: Set(payload.stock.unwrap_or(0)),
        category: Set(payload.category),
        image_url: Set(payload.image_url),
        supplier: Set(payload.supplier),
        barcode: Set(payload.barcode),
        sku: Set(payload.sku),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if let Some(name) = payload.name.as_ref() {
        if name.trim().is_empty() {
            return Err(AppError::MissingFields("name".into()));
        }
    }
    if let Some(category) = payload.category.as_ref() {
        if category.trim().is_empty() {
            return Err(AppError::MissingFields("category".into()));
        }
    }
    validate_amounts(payload.sale_price, payload.wholesale_price, payload.stock)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(wholesale_price) = payload.wholesale_price {
        active.wholesale_price = Set(Some(wholesale_price));
    }
    if let Some(sale_price) = payload.sale_price {
        active.sale_price = Set(sale_price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(supplier) = payload.supplier {
        active.supplier = Set(Some(supplier));
    }
    if let Some(barcode) = payload.barcode {
        active.barcode = Set(Some(barcode));
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(Some(sku));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Increase or decrease stock under a row lock so concurrent adjustments
/// cannot interleave between the read and the write.
pub async fn adjust_stock(
    state: &AppState,
    id: Uuid,
    payload: StockAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.quantity <= 0 {
        return Err(AppError::InvalidQuantity);
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let new_stock = match payload.action {
        StockAction::Increase => product.stock + payload.quantity,
        StockAction::Decrease => {
            if product.stock < payload.quantity {
                return Err(AppError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                    requested: payload.quantity,
                });
            }
            product.stock - payload.quantity
        }
    };

    let mut active: ActiveModel = product.into();
    active.stock = Set(new_stock);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(product_id = %updated.id, stock = new_stock, "stock adjusted");

    Ok(ApiResponse::success(
        "Stock adjusted",
        product_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination.normalize();

    let finder = Products::find()
        .filter(Column::Stock.lte(threshold))
        .order_by_asc(Column::Stock)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

fn validate_required(name: &str, category: &str) -> AppResult<()> {
    let mut missing = Vec::new();
    if name.trim().is_empty() {
        missing.push("name");
    }
    if category.trim().is_empty() {
        missing.push("category");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing.join(", ")))
    }
}

fn validate_amounts(
    sale_price: Option<f64>,
    wholesale_price: Option<f64>,
    stock: Option<i32>,
) -> AppResult<()> {
    if let Some(price) = sale_price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::InvalidInput("sale_price must be >= 0".into()));
        }
    }
    if let Some(price) = wholesale_price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::InvalidInput("wholesale_price must be >= 0".into()));
        }
    }
    if let Some(stock) = stock {
        if stock < 0 {
            return Err(AppError::InvalidInput("stock must be >= 0".into()));
        }
    }
    Ok(())
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        wholesale_price: model.wholesale_price,
        sale_price: model.sale_price,
        stock: model.stock,
        category: model.category,
        image_url: model.image_url,
        supplier: model.supplier,
        barcode: model.barcode,
        sku: model.sku,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
