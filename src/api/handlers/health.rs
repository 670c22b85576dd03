use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;

use super::AppState;
use crate::api::models::HealthResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::now("healthy"))
}

/// Ready once the vote store answers.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.ratings.check_store().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::now("ready"))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::now("unavailable")),
        ),
    }
}
