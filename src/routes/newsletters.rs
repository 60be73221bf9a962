use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::subscribers::{
        BulkTagRequest, CreateSubscriberRequest, SubscriberList, UpdateSubscriberRequest,
    },
    error::AppResult,
    models::Subscriber,
    response::ApiResponse,
    routes::params::SubscriberQuery,
    services::subscriber_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers).post(create_subscriber))
        .route("/tags", post(bulk_update_tags))
        .route(
            "/{id}",
            put(update_subscriber)
                .get(get_subscriber)
                .delete(delete_subscriber),
        )
}

#[utoipa::path(
    get,
    path = "/api/newsletters",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name, phone, city"),
        ("tag" = Option<String>, Query, description = "Filter by tag"),
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
    ),
    responses(
        (status = 200, description = "List subscribers", body = ApiResponse<SubscriberList>)
    ),
    tag = "Newsletters"
)]
pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<SubscriberQuery>,
) -> AppResult<Json<ApiResponse<SubscriberList>>> {
    Ok(Json(
        subscriber_service::list_subscribers(&state, query).await?,
    ))
}

#[utoipa::path(get, path = "/api/newsletters/{id}", tag = "Newsletters")]
pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Subscriber>>> {
    Ok(Json(subscriber_service::get_subscriber(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/newsletters",
    request_body = CreateSubscriberRequest,
    responses(
        (status = 200, description = "Create subscriber", body = ApiResponse<Subscriber>),
        (status = 400, description = "Missing fields, bad phone or duplicate phone"),
    ),
    tag = "Newsletters"
)]
pub async fn create_subscriber(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriberRequest>,
) -> AppResult<Json<ApiResponse<Subscriber>>> {
    Ok(Json(
        subscriber_service::create_subscriber(&state, payload).await?,
    ))
}

#[utoipa::path(put, path = "/api/newsletters/{id}", request_body = UpdateSubscriberRequest, tag = "Newsletters")]
pub async fn update_subscriber(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriberRequest>,
) -> AppResult<Json<ApiResponse<Subscriber>>> {
    Ok(Json(
        subscriber_service::update_subscriber(&state, id, payload).await?,
    ))
}

#[utoipa::path(delete, path = "/api/newsletters/{id}", tag = "Newsletters")]
pub async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        subscriber_service::delete_subscriber(&state, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/newsletters/tags",
    request_body = BulkTagRequest,
    responses((status = 200, description = "Tags added or removed in bulk")),
    tag = "Newsletters"
)]
pub async fn bulk_update_tags(
    State(state): State<AppState>,
    Json(payload): Json<BulkTagRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        subscriber_service::bulk_update_tags(&state, payload).await?,
    ))
}
