use std::sync::Arc;

use crate::cache::Cache;
use crate::config::settings::AppConfig;
use crate::database::{EntityCatalog, VoteStore};
use crate::rating::PriorRefresher;
use crate::services::{profile::ProfileService, rating::RatingService};

pub mod admin;
pub mod entities;
pub mod health;
pub mod voters;
pub mod votes;

pub struct AppState {
    pub ratings: Arc<RatingService>,
    pub profiles: Arc<ProfileService>,
    pub entities: Arc<dyn EntityCatalog>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services over the given collaborators.
    pub fn new(
        config: AppConfig,
        votes: Arc<dyn VoteStore>,
        entities: Arc<dyn EntityCatalog>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        let prior = Arc::new(PriorRefresher::new(votes.clone(), &config.prior));
        let ratings = Arc::new(RatingService::new(
            votes.clone(),
            cache.clone(),
            prior,
            config.cache.clone(),
            config.refresh.mode,
        ));
        let profiles = Arc::new(ProfileService::new(
            votes,
            entities.clone(),
            ratings.clone(),
            cache,
            config.cache.clone(),
        ));

        Self {
            ratings,
            profiles,
            entities,
            config,
        }
    }
}
