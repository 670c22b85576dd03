//! Process-local stores on `RwLock<HashMap>`, for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use super::models::{EntityQuery, ListOptions};
use super::store::{EntityCatalog, VoteStore};
use crate::domain::{
    Entity, EntityId, EntityRatingAggregate, Vote, VoteId, VoterId, models::round2,
};
use crate::errors::StoreError;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend(anyhow!("in-memory store lock poisoned")))
}

#[derive(Default)]
pub struct MemoryVoteStore {
    votes: RwLock<HashMap<VoteId, Vote>>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<P>(&self, predicate: P) -> Result<Vec<Vote>, StoreError>
    where
        P: Fn(&Vote) -> bool,
    {
        Ok(read(&self.votes)?
            .values()
            .filter(|vote| predicate(vote))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn save(&self, vote: &Vote) -> Result<Vote, StoreError> {
        let mut votes = write(&self.votes)?;
        let taken = votes.values().any(|existing| {
            existing.voter_id == vote.voter_id && existing.entity_id == vote.entity_id
        });
        if taken || votes.contains_key(&vote.id) {
            return Err(StoreError::Conflict(
                "vote already exists for this voter and entity".to_string(),
            ));
        }

        votes.insert(vote.id.clone(), vote.clone());
        Ok(vote.clone())
    }

    async fn get_by_id(&self, id: &VoteId) -> Result<Vote, StoreError> {
        read(&self.votes)?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_voter_and_entity(
        &self,
        voter_id: &VoterId,
        entity_id: &EntityId,
    ) -> Result<Vote, StoreError> {
        read(&self.votes)?
            .values()
            .find(|vote| &vote.voter_id == voter_id && &vote.entity_id == entity_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_voter(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        let votes = self.collect(|vote| &vote.voter_id == voter_id)?;
        Ok(options.apply(votes))
    }

    async fn get_by_entity(
        &self,
        entity_id: &EntityId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        let votes = self.collect(|vote| &vote.entity_id == entity_id)?;
        Ok(options.apply(votes))
    }

    async fn count_by_voter(&self, voter_id: &VoterId) -> Result<u64, StoreError> {
        Ok(self.collect(|vote| &vote.voter_id == voter_id)?.len() as u64)
    }

    async fn count_by_entity(&self, entity_id: &EntityId) -> Result<u64, StoreError> {
        Ok(self.collect(|vote| &vote.entity_id == entity_id)?.len() as u64)
    }

    async fn update(&self, vote: &Vote) -> Result<Vote, StoreError> {
        let mut votes = write(&self.votes)?;
        let stored = votes.get_mut(&vote.id).ok_or(StoreError::NotFound)?;

        stored.score = vote.score;
        stored.comment = vote.comment.clone();
        stored.updated_at = vote.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: &VoteId) -> Result<(), StoreError> {
        write(&self.votes)?
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, StoreError> {
        let votes = self.collect(|vote| &vote.entity_id == entity_id)?;
        Ok(EntityRatingAggregate::from_counts(
            entity_id.clone(),
            votes.iter().map(|vote| (vote.score, 1)),
        ))
    }

    async fn global_mean(&self) -> Result<Option<f64>, StoreError> {
        let votes = read(&self.votes)?;
        if votes.is_empty() {
            return Ok(None);
        }

        let total: u64 = votes.values().map(|vote| vote.score as u64).sum();
        Ok(Some(round2(total as f64 / votes.len() as f64)))
    }
}

#[derive(Default)]
pub struct MemoryEntityCatalog {
    entities: RwLock<HashMap<EntityId, Entity>>,
}

impl MemoryEntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityCatalog for MemoryEntityCatalog {
    async fn get_by_id(&self, id: &EntityId) -> Result<Entity, StoreError> {
        read(&self.entities)?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, entity: &Entity) -> Result<Entity, StoreError> {
        let mut entities = write(&self.entities)?;
        if entities.contains_key(&entity.id) {
            return Err(StoreError::Conflict("entity already exists".to_string()));
        }

        entities.insert(entity.id.clone(), entity.clone());
        Ok(entity.clone())
    }

    async fn search(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        let entities: Vec<Entity> = read(&self.entities)?.values().cloned().collect();
        Ok(query.apply(entities))
    }

    async fn count(&self, query: &EntityQuery) -> Result<u64, StoreError> {
        let entities = read(&self.entities)?;
        Ok(entities.values().filter(|e| query.matches(e)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{SortColumn, SortOrder};
    use chrono::{TimeZone, Utc};

    fn vote(id: &str, voter: &str, entity: &str, score: i64, secs: i64) -> Vote {
        Vote::new(
            VoteId::from(id),
            VoterId::from(voter),
            EntityId::from(entity),
            score,
            "",
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_vote_per_voter_and_entity() {
        let store = MemoryVoteStore::new();
        store.save(&vote("v1", "alice", "m1", 3, 0)).await.unwrap();

        let err = store.save(&vote("v2", "alice", "m1", 5, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.save(&vote("v3", "alice", "m2", 5, 2)).await.unwrap();
        store.save(&vote("v4", "bob", "m1", 5, 3)).await.unwrap();
        assert_eq!(store.count_by_entity(&EntityId::from("m1")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_listing_matches_sql_ordering() {
        let store = MemoryVoteStore::new();
        store.save(&vote("v1", "alice", "m1", 2, 0)).await.unwrap();
        store.save(&vote("v2", "alice", "m2", 5, 10)).await.unwrap();
        store.save(&vote("v3", "alice", "m3", 3, 20)).await.unwrap();

        let voter = VoterId::from("alice");
        let newest = store.get_by_voter(&voter, &ListOptions::page(2, 0)).await.unwrap();
        let ids: Vec<&str> = newest.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v3", "v2"]);

        let by_score = ListOptions::page(10, 1).sorted(SortColumn::Score, SortOrder::Asc);
        let rest = store.get_by_voter(&voter, &by_score).await.unwrap();
        let ids: Vec<&str> = rest.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v3", "v2"]);
    }

    #[tokio::test]
    async fn test_update_changes_only_mutable_fields() {
        let store = MemoryVoteStore::new();
        let original = store.save(&vote("v1", "alice", "m1", 2, 0)).await.unwrap();

        let mut changed = vote("v1", "mallory", "m9", 5, 60);
        changed.comment = "better on rewatch".to_string();
        let updated = store.update(&changed).await.unwrap();

        assert_eq!(updated.voter_id, original.voter_id);
        assert_eq!(updated.entity_id, original.entity_id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.score, 5);
        assert_eq!(updated.comment, "better on rewatch");
    }

    #[tokio::test]
    async fn test_aggregates() {
        let store = MemoryVoteStore::new();
        assert_eq!(store.global_mean().await.unwrap(), None);

        store.save(&vote("v1", "alice", "m1", 5, 0)).await.unwrap();
        store.save(&vote("v2", "bob", "m1", 4, 1)).await.unwrap();
        store.save(&vote("v3", "carol", "m2", 1, 2)).await.unwrap();

        let aggregate = store.entity_aggregate(&EntityId::from("m1")).await.unwrap();
        assert_eq!(aggregate.count, 2);
        assert_eq!(aggregate.mean, 4.5);
        assert_eq!(aggregate.histogram[&5], 1);

        // 10 / 3
        assert_eq!(store.global_mean().await.unwrap(), Some(3.33));

        store.delete(&VoteId::from("v3")).await.unwrap();
        assert!(matches!(
            store.delete(&VoteId::from("v3")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_entity_search_counts_every_match() {
        let catalog = MemoryEntityCatalog::new();
        for (id, title) in [("m1", "Heat"), ("m2", "Alien"), ("m3", "Heathers")] {
            catalog
                .save(&Entity::new(EntityId::from(id), title, "film"))
                .await
                .unwrap();
        }

        let query = EntityQuery::page(1, 0).titled("heat");
        let page = catalog.search(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id.as_str(), "m1");
        assert_eq!(catalog.count(&query).await.unwrap(), 2);
    }
}
