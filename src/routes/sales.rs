use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::sales::{CreateSaleRequest, SaleList, SaleWithItems, UpdateSaleRequest},
    error::AppResult,
    response::ApiResponse,
    routes::params::SaleListQuery,
    services::sale_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/{id}", put(update_sale).get(get_sale).delete(delete_sale))
}

#[utoipa::path(
    get,
    path = "/api/sales",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("from" = Option<String>, Query, description = "Sale date lower bound (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Sale date upper bound (RFC 3339)"),
    ),
    responses(
        (status = 200, description = "List sales", body = ApiResponse<SaleList>)
    ),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> AppResult<Json<ApiResponse<SaleList>>> {
    Ok(Json(sale_service::list_sales(&state, query).await?))
}

#[utoipa::path(get, path = "/api/sales/{id}", tag = "Sales")]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SaleWithItems>>> {
    Ok(Json(sale_service::get_sale(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 200, description = "Sale recorded with stock decremented", body = ApiResponse<SaleWithItems>),
        (status = 400, description = "Validation failure or insufficient stock"),
        (status = 404, description = "Referenced product not found"),
    ),
    tag = "Sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> AppResult<Json<ApiResponse<SaleWithItems>>> {
    Ok(Json(sale_service::create_sale(&state, payload).await?))
}

#[utoipa::path(put, path = "/api/sales/{id}", request_body = UpdateSaleRequest, tag = "Sales")]
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> AppResult<Json<ApiResponse<SaleWithItems>>> {
    Ok(Json(sale_service::update_sale(&state, id, payload).await?))
}

#[utoipa::path(delete, path = "/api/sales/{id}", tag = "Sales")]
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(sale_service::delete_sale(&state, id).await?))
}
