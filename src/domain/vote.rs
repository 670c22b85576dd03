use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EntityId, VoteId, VoterId};
use crate::errors::ValidationError;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// One voter's score and comment for one entity.
///
/// Only `score`, `comment` and `updated_at` ever change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter_id: VoterId,
    pub entity_id: EntityId,
    pub score: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        id: VoteId,
        voter_id: VoterId,
        entity_id: EntityId,
        score: i64,
        comment: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if voter_id.is_blank() {
            return Err(ValidationError::MissingVoter);
        }
        if entity_id.is_blank() {
            return Err(ValidationError::MissingEntity);
        }
        let score = validate_score(score)?;

        Ok(Self {
            id,
            voter_id,
            entity_id,
            score,
            comment: comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_score(&mut self, score: i64, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.score = validate_score(score)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_comment(&mut self, comment: &str, now: DateTime<Utc>) {
        self.comment = comment.trim().to_string();
        self.updated_at = now;
    }
}

pub fn validate_score(score: i64) -> Result<u8, ValidationError> {
    if score < MIN_SCORE as i64 || score > MAX_SCORE as i64 {
        return Err(ValidationError::InvalidScore(score));
    }
    Ok(score as u8)
}
