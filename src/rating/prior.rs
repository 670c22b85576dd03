use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, timeout};

use super::types::GlobalPrior;
use crate::config::settings::PriorSettings;
use crate::database::VoteStore;
use crate::errors::StoreError;

/// Owns the current [`GlobalPrior`] and keeps its global mean in line with
/// the vote store.
///
/// Readers always get a consistent copy. A refresh reads the store without
/// holding the lock and swaps only the mean, so concurrent refreshes are safe
/// and a failed one leaves the previous value in place.
pub struct PriorRefresher {
    store: Arc<dyn VoteStore>,
    current: RwLock<GlobalPrior>,
    fallback_mean: f64,
}

impl PriorRefresher {
    pub fn new(store: Arc<dyn VoteStore>, settings: &PriorSettings) -> Self {
        Self {
            store,
            current: RwLock::new(GlobalPrior::from_settings(settings)),
            fallback_mean: settings.default_global_mean,
        }
    }

    pub fn get(&self) -> GlobalPrior {
        // A GlobalPrior is replaced whole, a poisoned lock still holds a valid one.
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recomputes the global mean from the store and swaps it in.
    ///
    /// An empty store yields the configured default mean.
    pub async fn refresh_now(&self) -> Result<GlobalPrior, StoreError> {
        let mean = self
            .store
            .global_mean()
            .await?
            .unwrap_or(self.fallback_mean);

        let (old_mean, updated) = self.update(|prior| prior.global_mean = mean);
        if old_mean != mean {
            info!("Global prior mean updated: {old_mean:.2} -> {mean:.2}");
        } else {
            debug!("Global prior mean unchanged at {mean:.2}");
        }
        Ok(updated)
    }

    /// Startup refresh bounded by `startup_timeout`. On failure or timeout the
    /// configured default mean stays in effect; startup is never aborted.
    pub async fn initialize(&self, startup_timeout: Duration) -> GlobalPrior {
        match timeout(startup_timeout, self.refresh_now()).await {
            Ok(Ok(prior)) => {
                info!(
                    "Global prior initialized: mean={:.2} k={} min_votes={}",
                    prior.global_mean, prior.confidence_k, prior.min_votes
                );
                prior
            }
            Ok(Err(e)) => {
                warn!(
                    "Initial prior refresh failed, using default mean {:.2}: {e}",
                    self.fallback_mean
                );
                self.reset_mean()
            }
            Err(_) => {
                warn!(
                    "Initial prior refresh timed out after {startup_timeout:?}, \
                     using default mean {:.2}",
                    self.fallback_mean
                );
                self.reset_mean()
            }
        }
    }

    /// Replaces the operator-controlled parameters; the mean is kept.
    pub fn reconfigure(&self, min_votes: u64, confidence_k: f64) -> GlobalPrior {
        let (_, updated) = self.update(|prior| {
            prior.min_votes = min_votes;
            prior.confidence_k = confidence_k;
        });
        info!("Prior reconfigured: k={confidence_k} min_votes={min_votes}");
        updated
    }

    /// Refreshes every `interval` until `shutdown` flips to `true` or its
    /// sender is dropped. Failed ticks are logged and skipped.
    pub fn start_periodic_refresh(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let refresher = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; startup already refreshed.
            ticker.tick().await;

            info!("Periodic prior refresh every {interval:?}");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Periodic prior refresh stopped");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = refresher.refresh_now().await {
                            error!("Periodic prior refresh failed: {e}");
                        }
                    }
                }
            }
        })
    }

    fn reset_mean(&self) -> GlobalPrior {
        let fallback = self.fallback_mean;
        self.update(|prior| prior.global_mean = fallback).1
    }

    fn update<F>(&self, apply: F) -> (f64, GlobalPrior)
    where
        F: FnOnce(&mut GlobalPrior),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let old_mean = guard.global_mean;
        apply(&mut *guard);
        (old_mean, *guard)
    }
}
