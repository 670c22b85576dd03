use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::ids::{EntityId, VoterId};
use super::vote::{MAX_SCORE, MIN_SCORE, Vote};

/// Score value -> number of votes with that score. Always holds every score
/// in `MIN_SCORE..=MAX_SCORE`, zero-filled.
pub type Histogram = BTreeMap<u8, u64>;

/// Difference (voter score minus entity mean) above which a vote is "much" off.
pub const MUCH_DIFFERENCE: f64 = 0.5;
/// Difference within which a vote counts as the same as the entity mean.
pub const SLIGHT_DIFFERENCE: f64 = 0.1;

/// Per-entity vote statistics, computed from the vote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRatingAggregate {
    pub entity_id: EntityId,
    pub mean: f64,
    pub count: u64,
    pub histogram: Histogram,
}

impl EntityRatingAggregate {
    /// Builds the aggregate from `(score, count)` pairs. Scores outside the
    /// valid range are ignored.
    pub fn from_counts<I>(entity_id: EntityId, counts: I) -> Self
    where
        I: IntoIterator<Item = (u8, u64)>,
    {
        let mut histogram = empty_histogram();
        for (score, count) in counts {
            if let Some(slot) = histogram.get_mut(&score) {
                *slot += count;
            }
        }

        let (mean, count) = mean_of(&histogram);
        Self {
            entity_id,
            mean,
            count,
            histogram,
        }
    }

    pub fn empty(entity_id: EntityId) -> Self {
        Self::from_counts(entity_id, std::iter::empty())
    }
}

/// An entity aggregate together with its Bayesian-smoothed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedAggregate {
    #[serde(flatten)]
    pub aggregate: EntityRatingAggregate,
    pub bayesian_average: f64,
    pub confidence: f64,
    pub percentile: f64,
    pub explanation: String,
}

/// How a voter's score relates to the entity's current mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    MuchAbove,
    Above,
    Same,
    Below,
    MuchBelow,
    OnlyVote,
}

impl Comparison {
    pub fn between(score: u8, aggregate: &EntityRatingAggregate) -> Self {
        if aggregate.count <= 1 {
            return Comparison::OnlyVote;
        }

        let diff = score as f64 - aggregate.mean;
        if diff > MUCH_DIFFERENCE {
            Comparison::MuchAbove
        } else if diff > SLIGHT_DIFFERENCE {
            Comparison::Above
        } else if diff < -MUCH_DIFFERENCE {
            Comparison::MuchBelow
        } else if diff < -SLIGHT_DIFFERENCE {
            Comparison::Below
        } else {
            Comparison::Same
        }
    }
}

/// One row of a voter profile: the vote joined with its entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedEntity {
    pub vote: Vote,
    pub entity: Entity,
    pub entity_mean: f64,
    pub entity_votes: u64,
    pub user_vs_avg: Comparison,
}

/// Summary statistics over every vote a voter has cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterProfileAggregate {
    pub voter_id: VoterId,
    pub total_votes: u64,
    pub mean_score: f64,
    pub histogram: Histogram,
    pub category_breakdown: BTreeMap<String, u64>,
    pub favorite_category: Option<String>,
}

impl VoterProfileAggregate {
    /// Builds the profile from a voter's votes, each paired with the category
    /// of the voted entity.
    ///
    /// Votes are walked oldest first (ties by vote id); the favorite category
    /// is the one with the most votes, and among equals the one seen first.
    pub fn from_votes(voter_id: VoterId, mut votes: Vec<(Vote, String)>) -> Self {
        votes.sort_by(|(a, _), (b, _)| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut histogram = empty_histogram();
        let mut category_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for (vote, category) in &votes {
            if let Some(slot) = histogram.get_mut(&vote.score) {
                *slot += 1;
            }

            let count = category_breakdown.entry(category.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(category.clone());
            }
            *count += 1;
        }

        let mut favorite_category: Option<String> = None;
        let mut best = 0;
        for category in first_seen {
            let count = category_breakdown[&category];
            if count > best {
                best = count;
                favorite_category = Some(category);
            }
        }

        let (mean_score, total_votes) = mean_of(&histogram);
        Self {
            voter_id,
            total_votes,
            mean_score,
            histogram,
            category_breakdown,
            favorite_category,
        }
    }
}

/// Rounds to two decimal places, the precision means are reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn empty_histogram() -> Histogram {
    (MIN_SCORE..=MAX_SCORE).map(|score| (score, 0)).collect()
}

fn mean_of(histogram: &Histogram) -> (f64, u64) {
    let count: u64 = histogram.values().sum();
    if count == 0 {
        return (0.0, 0);
    }

    let total: u64 = histogram
        .iter()
        .map(|(score, n)| *score as u64 * n)
        .sum();
    (round2(total as f64 / count as f64), count)
}
