use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::MessageResponse;
use crate::domain::{Vote, VoteId};
use crate::errors::ServiceError;
use crate::services::rating::{CreateVoteRequest, UpdateVoteRequest};

pub async fn create_vote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateVoteRequest>,
) -> Result<(StatusCode, Json<Vote>), ServiceError> {
    let vote = state.ratings.create_vote(request).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

pub async fn get_vote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VoteId>,
) -> Result<Json<Vote>, ServiceError> {
    Ok(Json(state.ratings.get_vote(&id).await?))
}

pub async fn update_vote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VoteId>,
    Json(request): Json<UpdateVoteRequest>,
) -> Result<Json<Vote>, ServiceError> {
    Ok(Json(state.ratings.update_vote(&id, request).await?))
}

pub async fn delete_vote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VoteId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.ratings.delete_vote(&id).await?;
    Ok(Json(MessageResponse {
        message: format!("Vote {id} deleted"),
    }))
}
