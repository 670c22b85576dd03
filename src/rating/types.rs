use serde::{Deserialize, Serialize};

use crate::config::settings::PriorSettings;

/// Shrinkage target and smoothing parameters for the Bayesian estimator.
///
/// `global_mean` is refreshed from the vote population; `confidence_k` and
/// `min_votes` are operator-configured and never touched by a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPrior {
    pub global_mean: f64,
    pub confidence_k: f64,
    pub min_votes: u64,
}

impl GlobalPrior {
    pub fn from_settings(settings: &PriorSettings) -> Self {
        Self {
            global_mean: settings.default_global_mean,
            confidence_k: settings.confidence_k,
            min_votes: settings.min_votes,
        }
    }
}

impl Default for GlobalPrior {
    fn default() -> Self {
        Self::from_settings(&PriorSettings::default())
    }
}
