use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, put},
};
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, ProductList, StockAdjustRequest, UpdateProductRequest,
    },
    error::AppResult,
    models::Product,
    response::ApiResponse,
    routes::params::{LowStockQuery, ProductQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(list_low_stock))
        .route(
            "/{id}",
            put(update_product)
                .patch(patch_product)
                .get(get_product)
                .delete(delete_product),
        )
        .route("/{id}/stock", patch(adjust_stock))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name, description, SKU"),
        ("category" = Option<String>, Query, description = "Filter by category"),
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(product_service::list_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::get_product(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::create_product(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::update_product(&state, id, payload).await?,
    ))
}

// PATCH alias for partial updates; every field of the body is optional.
#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>)
    ),
    tag = "Products"
)]
pub async fn patch_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::update_product(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Deleted product")),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(product_service::delete_product(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = StockAdjustRequest,
    responses(
        (status = 200, description = "Adjusted stock", body = ApiResponse<Product>),
        (status = 400, description = "Insufficient stock"),
    ),
    tag = "Products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::adjust_stock(&state, id, payload).await?))
}

#[utoipa::path(get, path = "/api/products/low-stock", tag = "Products")]
pub async fn list_low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(product_service::list_low_stock(&state, query).await?))
}
