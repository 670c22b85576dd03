//! Test doubles shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::cache::Cache;
use crate::database::{ListOptions, MemoryVoteStore, VoteStore};
use crate::domain::{Clock, EntityId, EntityRatingAggregate, IdGenerator, Vote, VoteId, VoterId};
use crate::errors::{CacheError, StoreError};

fn refused() -> StoreError {
    StoreError::Backend(anyhow!("connection refused"))
}

/// A vote store whose every call fails with a backend error.
pub struct UnreachableStore;

#[async_trait]
impl VoteStore for UnreachableStore {
    async fn save(&self, _: &Vote) -> Result<Vote, StoreError> {
        Err(refused())
    }

    async fn get_by_id(&self, _: &VoteId) -> Result<Vote, StoreError> {
        Err(refused())
    }

    async fn get_by_voter_and_entity(&self, _: &VoterId, _: &EntityId) -> Result<Vote, StoreError> {
        Err(refused())
    }

    async fn get_by_voter(&self, _: &VoterId, _: &ListOptions) -> Result<Vec<Vote>, StoreError> {
        Err(refused())
    }

    async fn get_by_entity(&self, _: &EntityId, _: &ListOptions) -> Result<Vec<Vote>, StoreError> {
        Err(refused())
    }

    async fn count_by_voter(&self, _: &VoterId) -> Result<u64, StoreError> {
        Err(refused())
    }

    async fn count_by_entity(&self, _: &EntityId) -> Result<u64, StoreError> {
        Err(refused())
    }

    async fn update(&self, _: &Vote) -> Result<Vote, StoreError> {
        Err(refused())
    }

    async fn delete(&self, _: &VoteId) -> Result<(), StoreError> {
        Err(refused())
    }

    async fn entity_aggregate(&self, _: &EntityId) -> Result<EntityRatingAggregate, StoreError> {
        Err(refused())
    }

    async fn global_mean(&self) -> Result<Option<f64>, StoreError> {
        Err(refused())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(refused())
    }
}

/// Finds no existing vote, then loses the insert to a concurrent writer.
pub struct RacingStore;

#[async_trait]
impl VoteStore for RacingStore {
    async fn save(&self, vote: &Vote) -> Result<Vote, StoreError> {
        Err(StoreError::Conflict(format!(
            "UNIQUE constraint failed for {} / {}",
            vote.voter_id, vote.entity_id
        )))
    }

    async fn get_by_id(&self, _: &VoteId) -> Result<Vote, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn get_by_voter_and_entity(&self, _: &VoterId, _: &EntityId) -> Result<Vote, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn get_by_voter(&self, _: &VoterId, _: &ListOptions) -> Result<Vec<Vote>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_by_entity(&self, _: &EntityId, _: &ListOptions) -> Result<Vec<Vote>, StoreError> {
        Ok(Vec::new())
    }

    async fn count_by_voter(&self, _: &VoterId) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn count_by_entity(&self, _: &EntityId) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn update(&self, _: &Vote) -> Result<Vote, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn delete(&self, _: &VoteId) -> Result<(), StoreError> {
        Err(StoreError::NotFound)
    }

    async fn entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, StoreError> {
        Ok(EntityRatingAggregate::empty(entity_id.clone()))
    }

    async fn global_mean(&self) -> Result<Option<f64>, StoreError> {
        Ok(None)
    }
}

/// An in-memory vote store whose `global_mean` waits until `open` is called,
/// and then fails if the store was built with `failing`.
pub struct GatedStore {
    inner: MemoryVoteStore,
    gate: Semaphore,
    fail_global_mean: bool,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryVoteStore::new(),
            gate: Semaphore::new(0),
            fail_global_mean: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_global_mean: true,
            ..Self::new()
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl VoteStore for GatedStore {
    async fn save(&self, vote: &Vote) -> Result<Vote, StoreError> {
        self.inner.save(vote).await
    }

    async fn get_by_id(&self, id: &VoteId) -> Result<Vote, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_voter_and_entity(
        &self,
        voter_id: &VoterId,
        entity_id: &EntityId,
    ) -> Result<Vote, StoreError> {
        self.inner.get_by_voter_and_entity(voter_id, entity_id).await
    }

    async fn get_by_voter(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        self.inner.get_by_voter(voter_id, options).await
    }

    async fn get_by_entity(
        &self,
        entity_id: &EntityId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, StoreError> {
        self.inner.get_by_entity(entity_id, options).await
    }

    async fn count_by_voter(&self, voter_id: &VoterId) -> Result<u64, StoreError> {
        self.inner.count_by_voter(voter_id).await
    }

    async fn count_by_entity(&self, entity_id: &EntityId) -> Result<u64, StoreError> {
        self.inner.count_by_entity(entity_id).await
    }

    async fn update(&self, vote: &Vote) -> Result<Vote, StoreError> {
        self.inner.update(vote).await
    }

    async fn delete(&self, id: &VoteId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, StoreError> {
        self.inner.entity_aggregate(entity_id).await
    }

    async fn global_mean(&self) -> Result<Option<f64>, StoreError> {
        let _permit = self.gate.acquire().await.map_err(|e| StoreError::Backend(e.into()))?;
        if self.fail_global_mean {
            return Err(refused());
        }
        self.inner.global_mean().await
    }
}

/// A cache whose every call fails.
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("cache offline".to_string()))
    }

    async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("cache offline".to_string()))
    }

    async fn delete(&self, _: &[String]) -> Result<(), CacheError> {
        Err(CacheError::Backend("cache offline".to_string()))
    }

    async fn delete_pattern(&self, _: &str) -> Result<u64, CacheError> {
        Err(CacheError::Backend("cache offline".to_string()))
    }
}

/// Starts at a fixed instant and moves one second forward per call.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn new() -> Self {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + chrono::Duration::seconds(1);
        now
    }
}

/// Yields `vote-1`, `vote-2`, ...
#[derive(Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("vote-{n}")
    }
}
