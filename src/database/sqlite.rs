//! [`VoteStore`] and [`EntityCatalog`] over an r2d2 SQLite pool.
//!
//! rusqlite is blocking, so every call runs on tokio's blocking pool.

use anyhow::Context;
use async_trait::async_trait;

use super::connection::{self, DbConn, DbPool, get_connection, is_unique_violation};
use super::models::{EntityQuery, ListOptions};
use super::store::{EntityCatalog, VoteStore};
use super::{entities, votes};
use crate::domain::{Entity, EntityId, EntityRatingAggregate, Vote, VoteId, VoterId};
use crate::errors::StoreError;

async fn with_conn<T, F>(pool: &DbPool, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut DbConn) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut conn = get_connection(&pool)?;
        f(&mut conn)
    })
    .await
    .context("Database task did not complete")?;
    result
}

#[derive(Clone)]
pub struct SqliteVoteStore {
    pool: DbPool,
}

impl SqliteVoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteStore for SqliteVoteStore {
    async fn save(&self, vote: &Vote) -> Result<Vote, StoreError> {
        let vote = vote.clone();
        with_conn(&self.pool, move |conn| votes::insert_vote(conn, &vote))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict(
                        "vote already exists for this voter and entity".to_string(),
                    )
                } else {
                    StoreError::Backend(err)
                }
            })
    }

    async fn get_by_id(&self, id: &VoteId) -> Result<Vote, StoreError> {
        let id = id.clone();
        with_conn(&self.pool, move |conn| votes::find_by_id(conn, &id))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_voter_and_entity(
        &self,
        voter_id: &VoterId,
        entity_id: &EntityId,
    ) -> Result<Vote, StoreError> {
        let (voter_id, entity_id) = (voter_id.clone(), entity_id.clone());
        with_conn(&self.pool, move |conn| {
            votes::find_by_voter_and_entity(conn, &voter_id, &entity_id)
        })
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn get_by_voter(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        let (voter_id, options) = (voter_id.clone(), options.clone());
        let rows = with_conn(&self.pool, move |conn| {
            votes::list_by_voter(conn, &voter_id, &options)
        })
        .await?;
        Ok(rows)
    }

    async fn get_by_entity(
        &self,
        entity_id: &EntityId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        let (entity_id, options) = (entity_id.clone(), options.clone());
        let rows = with_conn(&self.pool, move |conn| {
            votes::list_by_entity(conn, &entity_id, &options)
        })
        .await?;
        Ok(rows)
    }

    async fn count_by_voter(&self, voter_id: &VoterId) -> Result<u64, StoreError> {
        let voter_id = voter_id.clone();
        Ok(with_conn(&self.pool, move |conn| votes::count_by_voter(conn, &voter_id)).await?)
    }

    async fn count_by_entity(&self, entity_id: &EntityId) -> Result<u64, StoreError> {
        let entity_id = entity_id.clone();
        Ok(with_conn(&self.pool, move |conn| votes::count_by_entity(conn, &entity_id)).await?)
    }

    async fn update(&self, vote: &Vote) -> Result<Vote, StoreError> {
        let vote = vote.clone();
        with_conn(&self.pool, move |conn| votes::update_vote(conn, &vote))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: &VoteId) -> Result<(), StoreError> {
        let id = id.clone();
        let removed = with_conn(&self.pool, move |conn| votes::delete_vote(conn, &id)).await?;
        if removed { Ok(()) } else { Err(StoreError::NotFound) }
    }

    async fn entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, StoreError> {
        let id = entity_id.clone();
        let counts = with_conn(&self.pool, move |conn| votes::score_counts(conn, &id)).await?;
        Ok(EntityRatingAggregate::from_counts(entity_id.clone(), counts))
    }

    async fn global_mean(&self) -> Result<Option<f64>, StoreError> {
        Ok(with_conn(&self.pool, votes::global_mean).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(with_conn(&self.pool, connection::ping).await?)
    }
}

#[derive(Clone)]
pub struct SqliteEntityCatalog {
    pool: DbPool,
}

impl SqliteEntityCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityCatalog for SqliteEntityCatalog {
    async fn get_by_id(&self, id: &EntityId) -> Result<Entity, StoreError> {
        let id = id.clone();
        with_conn(&self.pool, move |conn| entities::find_by_id(conn, &id))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, entity: &Entity) -> Result<Entity, StoreError> {
        let entity = entity.clone();
        with_conn(&self.pool, move |conn| entities::insert_entity(conn, &entity))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict("entity already exists".to_string())
                } else {
                    StoreError::Backend(err)
                }
            })
    }

    async fn search(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        let query = query.clone();
        let rows =
            with_conn(&self.pool, move |conn| entities::search_entities(conn, &query)).await?;
        Ok(rows)
    }

    async fn count(&self, query: &EntityQuery) -> Result<u64, StoreError> {
        let query = query.clone();
        Ok(with_conn(&self.pool, move |conn| entities::count_entities(conn, &query)).await?)
    }
}
