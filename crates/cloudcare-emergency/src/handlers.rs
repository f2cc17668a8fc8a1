use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use cloudcare_api::ApiError;
use serde::Serialize;
use serde_json::json;

use crate::routes::STREAM_PATH;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "service": "CloudCare Emergency API with SSE",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "sse_endpoint": STREAM_PATH,
        "delivery": state.broadcaster.delivery_mode().as_str(),
        "subscribers": state.broadcaster.subscriber_count(),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if state.shutdown.is_cancelled() {
        return Err(ApiError::service_unavailable("server is shutting down"));
    }
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}
