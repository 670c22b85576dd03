use std::sync::Arc;

use log::{error, info, warn};
use serde::Deserialize;

use crate::cache::{self, Cache, invalidation, keys};
use crate::config::settings::{CacheSettings, RefreshMode};
use crate::database::{ListOptions, VoteStore};
use crate::domain::{
    Clock, EnhancedAggregate, EntityId, EntityRatingAggregate, IdGenerator, SystemClock,
    UuidGenerator, Vote, VoteId, VoterId,
};
use crate::errors::{ServiceError, StoreError};
use crate::rating::{GlobalPrior, PriorRefresher, estimator};

const DUPLICATE_VOTE: &str = "Voter has already voted for this entity";
const VOTE_NOT_FOUND: &str = "Vote not found";

/// Missing fields deserialize to blank/zero values and fail validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateVoteRequest {
    pub voter_id: VoterId,
    pub entity_id: EntityId,
    pub score: i64,
    pub comment: Option<String>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVoteRequest {
    pub score: Option<i64>,
    pub comment: Option<String>,
}

/// One page of votes plus the total number of votes matching the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VotePage {
    pub votes: Vec<Vote>,
    pub total: u64,
}

/// Vote lifecycle and per-entity statistics.
///
/// Every successful mutation invalidates the affected cache entries and then
/// triggers a prior refresh.
pub struct RatingService {
    votes: Arc<dyn VoteStore>,
    cache: Arc<dyn Cache>,
    prior: Arc<PriorRefresher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    cache_settings: CacheSettings,
    refresh_mode: RefreshMode,
}

impl RatingService {
    pub fn new(
        votes: Arc<dyn VoteStore>,
        cache: Arc<dyn Cache>,
        prior: Arc<PriorRefresher>,
        cache_settings: CacheSettings,
        refresh_mode: RefreshMode,
    ) -> Self {
        Self {
            votes,
            cache,
            prior,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            cache_settings,
            refresh_mode,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn prior(&self) -> &Arc<PriorRefresher> {
        &self.prior
    }

    pub async fn create_vote(&self, request: CreateVoteRequest) -> Result<Vote, ServiceError> {
        let vote = Vote::new(
            VoteId::new(self.ids.generate()),
            request.voter_id,
            request.entity_id,
            request.score,
            request.comment.as_deref().unwrap_or_default(),
            self.clock.now(),
        )?;

        match self
            .votes
            .get_by_voter_and_entity(&vote.voter_id, &vote.entity_id)
            .await
        {
            Ok(_) => return Err(ServiceError::Conflict(DUPLICATE_VOTE.to_string())),
            Err(StoreError::NotFound) => {}
            Err(e) => {
                error!("Failed to check for an existing vote: {e}");
                return Err(ServiceError::internal("Failed to create vote"));
            }
        }

        // The store's uniqueness constraint catches races past the check above.
        let saved = match self.votes.save(&vote).await {
            Ok(saved) => saved,
            Err(StoreError::Conflict(_)) => {
                return Err(ServiceError::Conflict(DUPLICATE_VOTE.to_string()));
            }
            Err(e) => {
                error!("Failed to save vote: {e}");
                return Err(ServiceError::internal("Failed to create vote"));
            }
        };

        info!(
            "Vote {} created: voter={} entity={} score={}",
            saved.id, saved.voter_id, saved.entity_id, saved.score
        );
        self.after_mutation(&saved).await;
        Ok(saved)
    }

    /// Applies the supplied fields. A request with neither field returns the
    /// stored vote without writing.
    pub async fn update_vote(
        &self,
        id: &VoteId,
        request: UpdateVoteRequest,
    ) -> Result<Vote, ServiceError> {
        let mut vote = self.load_vote(id).await?;
        if request.score.is_none() && request.comment.is_none() {
            return Ok(vote);
        }

        let now = self.clock.now();
        if let Some(score) = request.score {
            vote.update_score(score, now)?;
        }
        if let Some(comment) = request.comment.as_deref() {
            vote.update_comment(comment, now);
        }

        let updated = match self.votes.update(&vote).await {
            Ok(updated) => updated,
            Err(StoreError::NotFound) => return Err(ServiceError::not_found(VOTE_NOT_FOUND)),
            Err(e) => {
                error!("Failed to update vote {id}: {e}");
                return Err(ServiceError::internal("Failed to update vote"));
            }
        };

        info!("Vote {} updated: score={}", updated.id, updated.score);
        self.after_mutation(&updated).await;
        Ok(updated)
    }

    pub async fn delete_vote(&self, id: &VoteId) -> Result<(), ServiceError> {
        let vote = self.load_vote(id).await?;

        match self.votes.delete(id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(ServiceError::not_found(VOTE_NOT_FOUND)),
            Err(e) => {
                error!("Failed to delete vote {id}: {e}");
                return Err(ServiceError::internal("Failed to delete vote"));
            }
        }

        info!("Vote {id} deleted: voter={} entity={}", vote.voter_id, vote.entity_id);
        self.after_mutation(&vote).await;
        Ok(())
    }

    pub async fn get_vote(&self, id: &VoteId) -> Result<Vote, ServiceError> {
        self.load_vote(id).await
    }

    pub async fn get_voter_vote(
        &self,
        voter_id: &VoterId,
        entity_id: &EntityId,
    ) -> Result<Vote, ServiceError> {
        match self.votes.get_by_voter_and_entity(voter_id, entity_id).await {
            Ok(vote) => Ok(vote),
            Err(StoreError::NotFound) => Err(ServiceError::not_found(VOTE_NOT_FOUND)),
            Err(e) => {
                error!("Failed to load vote of {voter_id} for {entity_id}: {e}");
                Err(ServiceError::internal("Failed to load vote"))
            }
        }
    }

    pub async fn list_entity_votes(
        &self,
        entity_id: &EntityId,
        options: &ListOptions,
    ) -> Result<VotePage, ServiceError> {
        let votes = self.votes.get_by_entity(entity_id, options).await;
        let total = self.votes.count_by_entity(entity_id).await;

        match (votes, total) {
            (Ok(votes), Ok(total)) => Ok(VotePage { votes, total }),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to list votes of entity {entity_id}: {e}");
                Err(ServiceError::internal("Failed to list votes"))
            }
        }
    }

    pub async fn list_voter_votes(
        &self,
        voter_id: &VoterId,
        options: &ListOptions,
    ) -> Result<VotePage, ServiceError> {
        let votes = self.votes.get_by_voter(voter_id, options).await;
        let total = self.votes.count_by_voter(voter_id).await;

        match (votes, total) {
            (Ok(votes), Ok(total)) => Ok(VotePage { votes, total }),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to list votes of voter {voter_id}: {e}");
                Err(ServiceError::internal("Failed to list votes"))
            }
        }
    }

    /// Read-through: cached for the entity-stats TTL, recomputed on a miss.
    pub async fn get_entity_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EntityRatingAggregate, ServiceError> {
        let key = keys::entity_stats(entity_id);
        if let Some(aggregate) = cache::load_json(self.cache.as_ref(), &key).await {
            return Ok(aggregate);
        }

        let aggregate = self.votes.entity_aggregate(entity_id).await.map_err(|e| {
            error!("Failed to aggregate votes of entity {entity_id}: {e}");
            ServiceError::internal("Failed to load entity statistics")
        })?;

        cache::save_json(
            self.cache.as_ref(),
            &key,
            &aggregate,
            self.cache_settings.entity_stats_ttl,
        )
        .await;
        Ok(aggregate)
    }

    /// The aggregate smoothed against the current prior. Never cached, so a
    /// prior refresh shows up on the next call.
    pub async fn get_enhanced_aggregate(
        &self,
        entity_id: &EntityId,
    ) -> Result<EnhancedAggregate, ServiceError> {
        let aggregate = self.get_entity_aggregate(entity_id).await?;
        Ok(estimator::enhance(aggregate, &self.prior.get()))
    }

    pub fn current_prior(&self) -> GlobalPrior {
        self.prior.get()
    }

    pub async fn refresh_prior(&self) -> Result<GlobalPrior, ServiceError> {
        self.prior.refresh_now().await.map_err(|e| {
            error!("Prior refresh failed: {e}");
            ServiceError::internal("Failed to refresh prior")
        })
    }

    /// Fails when the vote store does not answer.
    pub async fn check_store(&self) -> Result<(), ServiceError> {
        self.votes.ping().await.map_err(|e| {
            warn!("Vote store is not ready: {e}");
            ServiceError::internal("Vote store unavailable")
        })
    }

    async fn load_vote(&self, id: &VoteId) -> Result<Vote, ServiceError> {
        match self.votes.get_by_id(id).await {
            Ok(vote) => Ok(vote),
            Err(StoreError::NotFound) => Err(ServiceError::not_found(VOTE_NOT_FOUND)),
            Err(e) => {
                error!("Failed to load vote {id}: {e}");
                Err(ServiceError::internal("Failed to load vote"))
            }
        }
    }

    async fn after_mutation(&self, vote: &Vote) {
        let cache = self.cache.as_ref();
        if let Err(e) = invalidation::invalidate_entity(cache, &vote.entity_id).await {
            warn!("Failed to invalidate cached stats of entity {}: {e}", vote.entity_id);
        }
        if let Err(e) = invalidation::invalidate_voter(cache, &vote.voter_id).await {
            warn!("Failed to invalidate cached profile of voter {}: {e}", vote.voter_id);
        }

        self.trigger_prior_refresh().await;
    }

    async fn trigger_prior_refresh(&self) {
        match self.refresh_mode {
            RefreshMode::Inline => {
                if let Err(e) = self.prior.refresh_now().await {
                    error!("Prior refresh after mutation failed: {e}");
                }
            }
            RefreshMode::Background => {
                let prior = Arc::clone(&self.prior);
                tokio::spawn(async move {
                    if let Err(e) = prior.refresh_now().await {
                        error!("Prior refresh after mutation failed: {e}");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::settings::PriorSettings;
    use crate::database::MemoryVoteStore;
    use crate::errors::ValidationError;
    use crate::testing::{
        BrokenCache, GatedStore, RacingStore, SequentialIds, StepClock, UnreachableStore,
    };
    use std::time::Duration;

    struct Fixture {
        service: RatingService,
        cache: Arc<MemoryCache>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn VoteStore> = Arc::new(MemoryVoteStore::new());
        let cache = Arc::new(MemoryCache::new());
        Fixture {
            service: service_with(store, cache.clone()),
            cache,
        }
    }

    fn service_with(store: Arc<dyn VoteStore>, cache: Arc<dyn Cache>) -> RatingService {
        service_in_mode(store, cache, RefreshMode::Inline)
    }

    fn service_in_mode(
        store: Arc<dyn VoteStore>,
        cache: Arc<dyn Cache>,
        mode: RefreshMode,
    ) -> RatingService {
        let prior = Arc::new(PriorRefresher::new(store.clone(), &PriorSettings::default()));
        RatingService::new(store, cache, prior, CacheSettings::default(), mode)
            .with_clock(Arc::new(StepClock::new()))
            .with_id_generator(Arc::new(SequentialIds::default()))
    }

    /// Yields to spawned tasks until the prior's mean moves off `from`.
    async fn wait_for_mean_change(service: &RatingService, from: f64) -> f64 {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let mean = service.current_prior().global_mean;
                if mean != from {
                    return mean;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("prior was never refreshed")
    }

    fn request(voter: &str, entity: &str, score: i64) -> CreateVoteRequest {
        CreateVoteRequest {
            voter_id: VoterId::from(voter),
            entity_id: EntityId::from(entity),
            score,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_create_vote() {
        let fx = fixture();
        let vote = fx
            .service
            .create_vote(CreateVoteRequest {
                comment: Some("  loved it ".to_string()),
                ..request("alice", "m1", 5)
            })
            .await
            .unwrap();

        assert_eq!(vote.id.as_str(), "vote-1");
        assert_eq!(vote.comment, "loved it");
        assert_eq!(vote.created_at, vote.updated_at);
        assert_eq!(fx.service.get_vote(&vote.id).await.unwrap(), vote);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let fx = fixture();

        let err = fx.service.create_vote(request("alice", "m1", 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidScore(6))));

        let err = fx.service.create_vote(request("", "m1", 3)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::MissingVoter)));
    }

    #[tokio::test]
    async fn test_second_vote_for_same_entity_conflicts() {
        let fx = fixture();
        fx.service.create_vote(request("alice", "m1", 4)).await.unwrap();

        let err = fx.service.create_vote(request("alice", "m1", 2)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let stats = fx.service.get_entity_aggregate(&EntityId::from("m1")).await.unwrap();
        assert_eq!(stats.count, 1);
    }

    #[tokio::test]
    async fn test_conflict_on_insert_matches_the_pre_check() {
        let service = service_with(Arc::new(RacingStore), Arc::new(MemoryCache::new()));

        let err = service.create_vote(request("alice", "m1", 4)).await.unwrap_err();
        match err {
            ServiceError::Conflict(message) => assert_eq!(message, DUPLICATE_VOTE),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(service.current_prior().global_mean, 3.0);
    }

    #[tokio::test]
    async fn test_background_refresh_does_not_hold_up_the_mutation() {
        let store = Arc::new(GatedStore::new());
        let service = service_in_mode(
            store.clone(),
            Arc::new(MemoryCache::new()),
            RefreshMode::Background,
        );

        // The refresh is parked on the gate, yet the vote is already stored.
        let vote = service.create_vote(request("alice", "m1", 5)).await.unwrap();
        assert_eq!(service.get_vote(&vote.id).await.unwrap(), vote);
        assert_eq!(service.current_prior().global_mean, 3.0);

        store.open();
        assert_eq!(wait_for_mean_change(&service, 3.0).await, 5.0);
    }

    #[tokio::test]
    async fn test_failed_background_refresh_keeps_the_mutation() {
        let store = Arc::new(GatedStore::failing());
        store.open();
        let service = service_in_mode(
            store.clone(),
            Arc::new(MemoryCache::new()),
            RefreshMode::Background,
        );

        let vote = service.create_vote(request("alice", "m1", 5)).await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(service.current_prior().global_mean, 3.0);
        assert_eq!(service.get_vote(&vote.id).await.unwrap(), vote);
        service.delete_vote(&vote.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_applies_only_supplied_fields() {
        let fx = fixture();
        let created = fx
            .service
            .create_vote(CreateVoteRequest {
                comment: Some("fine".to_string()),
                ..request("alice", "m1", 2)
            })
            .await
            .unwrap();

        let updated = fx
            .service
            .update_vote(
                &created.id,
                UpdateVoteRequest {
                    score: Some(5),
                    comment: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.score, 5);
        assert_eq!(updated.comment, "fine");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let untouched = fx
            .service
            .update_vote(&created.id, UpdateVoteRequest::default())
            .await
            .unwrap();
        assert_eq!(untouched, updated);
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_vote_unchanged() {
        let fx = fixture();
        let created = fx.service.create_vote(request("alice", "m1", 3)).await.unwrap();

        let err = fx
            .service
            .update_vote(
                &created.id,
                UpdateVoteRequest {
                    score: Some(0),
                    comment: Some("oops".to_string()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(fx.service.get_vote(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_missing_votes_are_not_found() {
        let fx = fixture();
        let missing = VoteId::from("nope");

        assert!(matches!(
            fx.service.update_vote(&missing, UpdateVoteRequest::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(fx.service.delete_vote(&missing).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(fx.service.get_vote(&missing).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            fx.service
                .get_voter_vote(&VoterId::from("alice"), &EntityId::from("m1"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cached_stats() {
        let fx = fixture();
        let entity = EntityId::from("m1");
        fx.service.create_vote(request("alice", "m1", 5)).await.unwrap();

        let before = fx.service.get_entity_aggregate(&entity).await.unwrap();
        assert_eq!(before.count, 1);
        assert!(fx.cache.get(&keys::entity_stats(&entity)).await.unwrap().is_some());

        let second = fx.service.create_vote(request("bob", "m1", 1)).await.unwrap();
        assert!(fx.cache.get(&keys::entity_stats(&entity)).await.unwrap().is_none());
        assert_eq!(fx.service.get_entity_aggregate(&entity).await.unwrap().count, 2);

        fx.service.delete_vote(&second.id).await.unwrap();
        let after = fx.service.get_entity_aggregate(&entity).await.unwrap();
        assert_eq!(after.count, 1);
        assert_eq!(after.mean, 5.0);
    }

    #[tokio::test]
    async fn test_mutations_refresh_the_prior() {
        let fx = fixture();
        assert_eq!(fx.service.current_prior().global_mean, 3.0);

        fx.service.create_vote(request("alice", "m1", 5)).await.unwrap();
        let vote = fx.service.create_vote(request("bob", "m2", 4)).await.unwrap();
        assert_eq!(fx.service.current_prior().global_mean, 4.5);

        fx.service.delete_vote(&vote.id).await.unwrap();
        assert_eq!(fx.service.current_prior().global_mean, 5.0);
    }

    #[tokio::test]
    async fn test_enhanced_aggregate_of_unvoted_entity_is_the_prior() {
        let fx = fixture();
        let enhanced = fx
            .service
            .get_enhanced_aggregate(&EntityId::from("m-new"))
            .await
            .unwrap();

        assert_eq!(enhanced.aggregate.count, 0);
        assert_eq!(enhanced.bayesian_average, 3.0);
        assert_eq!(enhanced.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_enhanced_aggregate_tracks_refreshed_prior() {
        let fx = fixture();
        for voter in ["a", "b", "c", "d"] {
            fx.service.create_vote(request(voter, "m1", 5)).await.unwrap();
        }
        fx.service.create_vote(request("a", "m2", 1)).await.unwrap();

        // Global mean is 21 / 5.
        let enhanced = fx.service.get_enhanced_aggregate(&EntityId::from("m1")).await.unwrap();
        let expected = (25.0 * 4.2 + 5.0 * 4.0) / 29.0;
        assert!((enhanced.bayesian_average - expected).abs() < 1e-9);
        assert_eq!(enhanced.confidence, 0.4);
    }

    #[tokio::test]
    async fn test_listings_report_totals() {
        let fx = fixture();
        for entity in ["m1", "m2", "m3"] {
            fx.service.create_vote(request("alice", entity, 4)).await.unwrap();
        }
        fx.service.create_vote(request("bob", "m1", 2)).await.unwrap();

        let page = fx
            .service
            .list_voter_votes(&VoterId::from("alice"), &ListOptions::page(2, 0))
            .await
            .unwrap();
        assert_eq!(page.votes.len(), 2);
        assert_eq!(page.total, 3);
        // Newest first.
        assert_eq!(page.votes[0].entity_id.as_str(), "m3");

        let page = fx
            .service
            .list_entity_votes(&EntityId::from("m1"), &ListOptions::page(20, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_with_generic_message() {
        let service = service_with(Arc::new(UnreachableStore), Arc::new(MemoryCache::new()));

        let err = service.create_vote(request("alice", "m1", 3)).await.unwrap_err();
        match err {
            ServiceError::Internal(message) => assert!(!message.contains("refused")),
            other => panic!("expected internal error, got {other:?}"),
        }

        assert!(matches!(
            service.get_entity_aggregate(&EntityId::from("m1")).await,
            Err(ServiceError::Internal(_))
        ));
        assert!(service.refresh_prior().await.is_err());
        assert!(service.check_store().await.is_err());
    }

    #[tokio::test]
    async fn test_broken_cache_does_not_fail_requests() {
        let store: Arc<dyn VoteStore> = Arc::new(MemoryVoteStore::new());
        let service = service_with(store, Arc::new(BrokenCache));

        let vote = service.create_vote(request("alice", "m1", 4)).await.unwrap();
        let stats = service.get_entity_aggregate(&vote.entity_id).await.unwrap();
        assert_eq!(stats.count, 1);
        service.delete_vote(&vote.id).await.unwrap();
    }
}
