use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use log::{error, info};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{CreateEntityRequest, PaginatedResponse};
use crate::api::parsers::{
    EntitySearchParams, ListParams, parse_entity_query, parse_list_options,
};
use crate::domain::{EnhancedAggregate, Entity, EntityId, EntityRatingAggregate, Vote};
use crate::errors::{ServiceError, StoreError, ValidationError};

pub async fn create_entity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEntityRequest>,
) -> Result<(StatusCode, Json<Entity>), ServiceError> {
    if request.id.is_blank() {
        return Err(ValidationError::MissingEntity.into());
    }
    if request.title.trim().is_empty() {
        return Err(ValidationError::InvalidParameter("title cannot be empty".to_string()).into());
    }

    let entity = Entity::new(request.id, &request.title, &request.category);
    match state.entities.save(&entity).await {
        Ok(saved) => {
            info!("Entity {} registered in category {:?}", saved.id, saved.category);
            Ok((StatusCode::CREATED, Json(saved)))
        }
        Err(StoreError::Conflict(_)) => Err(ServiceError::Conflict(format!(
            "Entity {} already exists",
            entity.id
        ))),
        Err(e) => {
            error!("Failed to save entity {}: {e}", entity.id);
            Err(ServiceError::internal("Failed to save entity"))
        }
    }
}

pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntitySearchParams>,
) -> Result<Json<PaginatedResponse<Entity>>, ServiceError> {
    let query = parse_entity_query(&params, &state.config.pagination)?;
    let entities = state.entities.search(&query).await;
    let total = state.entities.count(&query).await;

    match (entities, total) {
        (Ok(entities), Ok(total)) => Ok(Json(PaginatedResponse::with_paging(
            entities,
            total,
            query.limit,
            query.offset,
        ))),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to search entities: {e}");
            Err(ServiceError::internal("Failed to list entities"))
        }
    }
}

pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<Json<Entity>, ServiceError> {
    match state.entities.get_by_id(&id).await {
        Ok(entity) => Ok(Json(entity)),
        Err(StoreError::NotFound) => Err(ServiceError::not_found("Entity not found")),
        Err(e) => {
            error!("Failed to load entity {id}: {e}");
            Err(ServiceError::internal("Failed to load entity"))
        }
    }
}

pub async fn list_entity_votes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Vote>>, ServiceError> {
    let options = parse_list_options(&params, &state.config.pagination)?;
    let page = state.ratings.list_entity_votes(&id, &options).await?;
    Ok(Json(PaginatedResponse::new(page.votes, page.total, &options)))
}

pub async fn entity_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<Json<EntityRatingAggregate>, ServiceError> {
    Ok(Json(state.ratings.get_entity_aggregate(&id).await?))
}

pub async fn enhanced_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<Json<EnhancedAggregate>, ServiceError> {
    Ok(Json(state.ratings.get_enhanced_aggregate(&id).await?))
}
