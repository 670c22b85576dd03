use std::collections::HashMap;
use std::sync::Arc;

use log::{error, warn};
use serde::{Deserialize, Serialize};

use super::rating::RatingService;
use crate::cache::{self, Cache, invalidation, keys};
use crate::config::settings::CacheSettings;
use crate::database::{EntityCatalog, ListOptions, VoteStore};
use crate::domain::{
    Comparison, Entity, EntityId, RatedEntity, Vote, VoterId, VoterProfileAggregate,
};
use crate::errors::{CacheError, ServiceError, StoreError};

const PROFILE_FAILED: &str = "Failed to load voter profile";

/// A page of a voter's rated entities plus the summary over all their votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterProfile {
    pub items: Vec<RatedEntity>,
    pub stats: VoterProfileAggregate,
}

/// Voter-centric reads: each vote joined with its entity and the entity's
/// current statistics.
pub struct ProfileService {
    votes: Arc<dyn VoteStore>,
    entities: Arc<dyn EntityCatalog>,
    ratings: Arc<RatingService>,
    cache: Arc<dyn Cache>,
    cache_settings: CacheSettings,
}

impl ProfileService {
    pub fn new(
        votes: Arc<dyn VoteStore>,
        entities: Arc<dyn EntityCatalog>,
        ratings: Arc<RatingService>,
        cache: Arc<dyn Cache>,
        cache_settings: CacheSettings,
    ) -> Self {
        Self {
            votes,
            entities,
            ratings,
            cache,
            cache_settings,
        }
    }

    /// A voter's profile page. A vote whose entity is missing from the
    /// catalog fails the whole request.
    pub async fn get_voter_profile(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<VoterProfile, ServiceError> {
        let key = keys::voter_profile(voter_id, options);
        let cached: Option<Vec<RatedEntity>> = cache::load_json(self.cache.as_ref(), &key).await;

        let items = match cached {
            Some(items) => items,
            None => {
                let items = self.rated_entities(voter_id, options).await?;
                cache::save_json(
                    self.cache.as_ref(),
                    &key,
                    &items,
                    self.cache_settings.voter_profile_ttl,
                )
                .await;
                items
            }
        };

        let stats = self.get_voter_stats(voter_id).await?;
        Ok(VoterProfile { items, stats })
    }

    /// Summary over every vote of the voter, cached for the voter-stats TTL.
    pub async fn get_voter_stats(
        &self,
        voter_id: &VoterId,
    ) -> Result<VoterProfileAggregate, ServiceError> {
        let key = keys::voter_stats(voter_id);
        if let Some(stats) = cache::load_json(self.cache.as_ref(), &key).await {
            return Ok(stats);
        }

        let votes = self.voter_votes(voter_id, &ListOptions::unbounded()).await?;
        let mut entities = HashMap::new();
        let mut categorized = Vec::with_capacity(votes.len());
        for vote in votes {
            let category = self.entity(&vote, &mut entities).await?.category;
            categorized.push((vote, category));
        }

        let stats = VoterProfileAggregate::from_votes(voter_id.clone(), categorized);
        cache::save_json(
            self.cache.as_ref(),
            &key,
            &stats,
            self.cache_settings.voter_stats_ttl,
        )
        .await;
        Ok(stats)
    }

    /// Drops the voter's summary and every cached profile page.
    pub async fn invalidate_voter_cache(&self, voter_id: &VoterId) -> Result<(), CacheError> {
        invalidation::invalidate_voter(self.cache.as_ref(), voter_id).await
    }

    async fn rated_entities(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<RatedEntity>, ServiceError> {
        let votes = self.voter_votes(voter_id, options).await?;
        let mut entities = HashMap::new();
        let mut items = Vec::with_capacity(votes.len());

        for vote in votes {
            let entity = self.entity(&vote, &mut entities).await?;
            let aggregate = self.ratings.get_entity_aggregate(&vote.entity_id).await?;

            items.push(RatedEntity {
                user_vs_avg: Comparison::between(vote.score, &aggregate),
                entity_mean: aggregate.mean,
                entity_votes: aggregate.count,
                vote,
                entity,
            });
        }

        Ok(items)
    }

    async fn voter_votes(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<Vec<Vote>, ServiceError> {
        self.votes.get_by_voter(voter_id, options).await.map_err(|e| {
            error!("Failed to list votes of voter {voter_id}: {e}");
            ServiceError::internal(PROFILE_FAILED)
        })
    }

    async fn entity(
        &self,
        vote: &Vote,
        seen: &mut HashMap<EntityId, Entity>,
    ) -> Result<Entity, ServiceError> {
        if let Some(entity) = seen.get(&vote.entity_id) {
            return Ok(entity.clone());
        }

        match self.entities.get_by_id(&vote.entity_id).await {
            Ok(entity) => {
                seen.insert(entity.id.clone(), entity.clone());
                Ok(entity)
            }
            Err(StoreError::NotFound) => {
                warn!(
                    "Vote {} references entity {} which is not in the catalog",
                    vote.id, vote.entity_id
                );
                Err(ServiceError::internal(PROFILE_FAILED))
            }
            Err(e) => {
                error!("Failed to load entity {}: {e}", vote.entity_id);
                Err(ServiceError::internal(PROFILE_FAILED))
            }
        }
    }
}
