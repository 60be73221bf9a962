use axum::{Json, Router, extract::State, routing::post};
use tokio_util::sync::CancellationToken;

use crate::{
    dto::whatsapp::{BulkSendRequest, DispatchReport, TestSendRequest},
    error::AppResult,
    response::ApiResponse,
    services::whatsapp_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send_bulk))
        .route("/test", post(send_test))
}

#[utoipa::path(
    post,
    path = "/api/whatsapp/send",
    request_body = BulkSendRequest,
    responses(
        (status = 200, description = "Dispatch report", body = ApiResponse<DispatchReport>),
        (status = 400, description = "Missing template or body"),
    ),
    tag = "WhatsApp"
)]
pub async fn send_bulk(
    State(state): State<AppState>,
    Json(payload): Json<BulkSendRequest>,
) -> AppResult<Json<ApiResponse<DispatchReport>>> {
    // Per-request token; a future graceful-shutdown hook can cancel it.
    let cancel = CancellationToken::new();
    Ok(Json(
        whatsapp_service::send_bulk(&state, payload, cancel).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/whatsapp/test",
    request_body = TestSendRequest,
    responses(
        (status = 200, description = "Single templated send"),
        (status = 400, description = "Unresolved template parameters"),
        (status = 500, description = "Provider rejected the message"),
    ),
    tag = "WhatsApp"
)]
pub async fn send_test(
    State(state): State<AppState>,
    Json(payload): Json<TestSendRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(whatsapp_service::send_test(&state, payload).await?))
}
