use async_trait::async_trait;

use super::models::{EntityQuery, ListOptions};
use crate::domain::{Entity, EntityId, EntityRatingAggregate, Vote, VoteId, VoterId};
use crate::errors::StoreError;

/// Persistence of votes and the aggregate queries over them.
///
/// Implementations must enforce at most one vote per `(voter, entity)` pair and
/// report a violation as [`StoreError::Conflict`]. Lookups of missing rows
/// return [`StoreError::NotFound`].
#[async_trait]
pub trait VoteStore: Send + Sync + 'static {
    async fn save(&self, vote: &Vote) -> Result<Vote, StoreError>;

    async fn get_by_id(&self, id: &VoteId) -> Result<Vote, StoreError>;

    async fn get_by_voter_and_entity(
        &self,
        voter_id: &VoterId,
        entity_id: &EntityId,
    ) -> Result<Vote, StoreError>;

    async fn get_by_voter(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError>;

    async fn get_by_entity(
        &self,
        entity_id: &EntityId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError>;

    async fn count_by_voter(&self, voter_id: &VoterId) -> Result<u64, StoreError>;

    async fn count_by_entity(&self, entity_id: &EntityId) -> Result<u64, StoreError>;

    /// Persists score, comment and `updated_at` of an existing vote.
    async fn update(&self, vote: &Vote) -> Result<Vote, StoreError>;

    async fn delete(&self, id: &VoteId) -> Result<(), StoreError>;

    /// Mean, count and histogram of the entity's votes. An entity without
    /// votes yields an empty aggregate, not an error.
    async fn entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, StoreError>;

    /// Mean score over every vote, rounded to two decimals. `None` when there
    /// are no votes at all.
    async fn global_mean(&self) -> Result<Option<f64>, StoreError>;

    /// Cheapest possible round trip, used by the readiness check.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Metadata lookup for rated entities.
#[async_trait]
pub trait EntityCatalog: Send + Sync + 'static {
    async fn get_by_id(&self, id: &EntityId) -> Result<Entity, StoreError>;

    async fn save(&self, entity: &Entity) -> Result<Entity, StoreError>;

    /// Matching entities, ordered by title and then id.
    async fn search(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError>;

    /// Number of entities matching the filters of `query`; paging is ignored.
    async fn count(&self, query: &EntityQuery) -> Result<u64, StoreError>;
}
