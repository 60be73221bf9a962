use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::customers::{CreateCustomerRequest, CustomerList, UpdateCustomerRequest},
    error::AppResult,
    models::Customer,
    response::ApiResponse,
    routes::params::CustomerQuery,
    services::customer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/{id}",
            put(update_customer).get(get_customer).delete(delete_customer),
        )
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name, email, phone"),
    ),
    responses(
        (status = 200, description = "List customers", body = ApiResponse<CustomerList>)
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    Ok(Json(customer_service::list_customers(&state, query).await?))
}

#[utoipa::path(get, path = "/api/customers/{id}", tag = "Customers")]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    Ok(Json(customer_service::get_customer(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 200, description = "Create customer", body = ApiResponse<Customer>),
        (status = 400, description = "Missing fields or duplicate email"),
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    Ok(Json(
        customer_service::create_customer(&state, payload).await?,
    ))
}

#[utoipa::path(put, path = "/api/customers/{id}", request_body = UpdateCustomerRequest, tag = "Customers")]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    Ok(Json(
        customer_service::update_customer(&state, id, payload).await?,
    ))
}

#[utoipa::path(delete, path = "/api/customers/{id}", tag = "Customers")]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(customer_service::delete_customer(&state, id).await?))
}
