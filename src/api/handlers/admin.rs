use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Json, Response},
};
use log::{info, warn};
use std::sync::Arc;

use super::AppState;
use crate::api::error::error_response;
use crate::api::models::ReconfigurePriorRequest;
use crate::config::settings::PriorSettings;
use crate::errors::ValidationError;
use crate::rating::GlobalPrior;

pub async fn get_prior(State(state): State<Arc<AppState>>) -> Json<GlobalPrior> {
    Json(state.ratings.current_prior())
}

pub async fn refresh_prior(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    info!("Admin triggered prior refresh");
    match state.ratings.refresh_prior().await {
        Ok(prior) => Json(prior).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn reconfigure_prior(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ReconfigurePriorRequest>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    if !PriorSettings::is_valid_confidence_k(request.confidence_k) {
        return ValidationError::InvalidParameter(format!(
            "confidence_k must be a positive number, got {}",
            request.confidence_k
        ))
        .into_response();
    }

    let prior = state
        .ratings
        .prior()
        .reconfigure(request.min_votes, request.confidence_k);
    Json(prior).into_response()
}

/// Admin routes are closed unless an admin token is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(token) = state.config.server.admin_token.as_deref() else {
        return Err(error_response(StatusCode::FORBIDDEN, "Admin endpoints are disabled"));
    };

    let supplied = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if supplied != Some(token) {
        warn!("Rejected admin request with missing or wrong token");
        return Err(error_response(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    Ok(())
}
