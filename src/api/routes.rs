use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;

use crate::api::handlers::{
    AppState,
    admin::{get_prior, reconfigure_prior, refresh_prior},
    entities::{
        create_entity, enhanced_stats, entity_stats, get_entity, list_entities, list_entity_votes,
    },
    health::{health, ready},
    voters::{get_voter_vote, list_voter_votes, voter_profile},
    votes::{create_vote, delete_vote, get_vote, update_vote},
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/votes", post(create_vote))
        .route("/api/votes/:id", get(get_vote).put(update_vote).delete(delete_vote))
        .route("/api/entities", get(list_entities).post(create_entity))
        .route("/api/entities/:id", get(get_entity))
        .route("/api/entities/:id/votes", get(list_entity_votes))
        .route("/api/entities/:id/stats", get(entity_stats))
        .route("/api/entities/:id/stats/enhanced", get(enhanced_stats))
        .route("/api/voters/:id/votes", get(list_voter_votes))
        .route("/api/voters/:id/votes/:entity_id", get(get_voter_vote))
        .route("/api/voters/:id/profile", get(voter_profile))
        .route("/api/prior", get(get_prior))
        .route("/api/admin/prior", put(reconfigure_prior))
        .route("/api/admin/prior/refresh", post(refresh_prior))
        .with_state(state)
}
