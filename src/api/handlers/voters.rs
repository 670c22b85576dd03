use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{PaginatedResponse, VoterProfileResponse};
use crate::api::parsers::{ListParams, parse_list_options};
use crate::domain::{EntityId, Vote, VoterId};
use crate::errors::ServiceError;

pub async fn list_voter_votes(
    State(state): State<Arc<AppState>>,
    Path(voter_id): Path<VoterId>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Vote>>, ServiceError> {
    let options = parse_list_options(&params, &state.config.pagination)?;
    let page = state.ratings.list_voter_votes(&voter_id, &options).await?;
    Ok(Json(PaginatedResponse::new(page.votes, page.total, &options)))
}

pub async fn get_voter_vote(
    State(state): State<Arc<AppState>>,
    Path((voter_id, entity_id)): Path<(VoterId, EntityId)>,
) -> Result<Json<Vote>, ServiceError> {
    Ok(Json(state.ratings.get_voter_vote(&voter_id, &entity_id).await?))
}

pub async fn voter_profile(
    State(state): State<Arc<AppState>>,
    Path(voter_id): Path<VoterId>,
    Query(params): Query<ListParams>,
) -> Result<Json<VoterProfileResponse>, ServiceError> {
    let options = parse_list_options(&params, &state.config.pagination)?;
    let profile = state.profiles.get_voter_profile(&voter_id, &options).await?;
    let total = profile.stats.total_votes;

    Ok(Json(VoterProfileResponse {
        page: PaginatedResponse::new(profile.items, total, &options),
        stats: profile.stats,
    }))
}
