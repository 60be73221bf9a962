use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::dashboard::{DashboardQuery, DashboardSummary},
    error::AppResult,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(summary))
        .route("/cache/clear", post(clear_cache))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(
        ("period" = Option<String>, Query, description = "week | month | year, default month"),
    ),
    responses(
        (status = 200, description = "Summary statistics", body = ApiResponse<DashboardSummary>)
    ),
    tag = "Dashboard"
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let period = query.period.unwrap_or_default();
    Ok(Json(dashboard_service::summary(&state, period).await?))
}

#[utoipa::path(post, path = "/api/dashboard/cache/clear", tag = "Dashboard")]
pub async fn clear_cache(
    State(state): State<AppState>,
) -> Json<ApiResponse<serde_json::Value>> {
    Json(dashboard_service::clear_cache(&state))
}
