//! Bayesian smoothing of per-entity vote statistics.
//!
//! Every function here is pure: the current [`GlobalPrior`] is passed in by the
//! caller, nothing reads shared state.

use log::debug;

use super::types::GlobalPrior;
use crate::domain::{EnhancedAggregate, EntityRatingAggregate};

/// Smoothed-average lower bounds and the percentile each maps to, highest first.
///
/// This is a coarse hand-tuned heuristic for a 1-5 scale, not a percentile
/// computed from the actual population.
pub const PERCENTILE_BANDS: [(f64, f64); 9] = [
    (4.5, 95.0),
    (4.2, 90.0),
    (4.0, 80.0),
    (3.8, 70.0),
    (3.5, 60.0),
    (3.2, 50.0),
    (3.0, 40.0),
    (2.5, 20.0),
    (2.0, 10.0),
];

/// Percentile for averages below every band.
pub const FLOOR_PERCENTILE: f64 = 5.0;

/// `(K*m + R*v) / (K + v)`, where K is the confidence constant, m the global
/// mean, R the entity mean and v the entity vote count. With no votes the
/// global mean is returned as is.
pub fn bayesian_average(entity_mean: f64, entity_votes: u64, prior: &GlobalPrior) -> f64 {
    if entity_votes == 0 {
        return prior.global_mean;
    }

    let k = prior.confidence_k;
    let v = entity_votes as f64;
    (k * prior.global_mean + entity_mean * v) / (k + v)
}

/// Share of the minimum-votes threshold reached, capped at 1.
pub fn confidence(entity_votes: u64, prior: &GlobalPrior) -> f64 {
    if entity_votes >= prior.min_votes {
        return 1.0;
    }
    entity_votes as f64 / prior.min_votes as f64
}

pub fn percentile_bucket(bayesian_average: f64) -> f64 {
    PERCENTILE_BANDS
        .iter()
        .find(|(lower_bound, _)| bayesian_average >= *lower_bound)
        .map(|(_, percentile)| *percentile)
        .unwrap_or(FLOOR_PERCENTILE)
}

pub fn explanation(total_votes: u64, confidence: f64, min_votes: u64) -> String {
    if total_votes == 0 {
        return "No votes yet. Score shows the global prior.".to_string();
    }

    if total_votes < min_votes {
        return format!(
            "Adjusted for small sample size ({total_votes} votes). \
             The score is blended with the global prior."
        );
    }

    if confidence >= 0.95 {
        return format!("High confidence rating based on {total_votes} votes.");
    }

    if confidence >= 0.8 {
        return format!("Reliable rating based on {total_votes} votes.");
    }

    format!(
        "Rating based on {total_votes} votes with {:.0}% confidence.",
        confidence * 100.0
    )
}

/// Applies the estimator to an entity aggregate.
pub fn enhance(aggregate: EntityRatingAggregate, prior: &GlobalPrior) -> EnhancedAggregate {
    let bayesian_average = bayesian_average(aggregate.mean, aggregate.count, prior);
    let confidence = confidence(aggregate.count, prior);
    let percentile = percentile_bucket(bayesian_average);
    let explanation = explanation(aggregate.count, confidence, prior.min_votes);

    debug!(
        "Smoothed entity {}: mean={} votes={} global_mean={} k={} -> bayesian={:.4}",
        aggregate.entity_id,
        aggregate.mean,
        aggregate.count,
        prior.global_mean,
        prior.confidence_k,
        bayesian_average
    );

    EnhancedAggregate {
        aggregate,
        bayesian_average,
        confidence,
        percentile,
        explanation,
    }
}
