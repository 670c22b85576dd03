use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::ListOptions;
use crate::domain::{EntityId, RatedEntity, VoterProfileAggregate};
use crate::pagination::has_more;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, options: &ListOptions) -> Self {
        Self::with_paging(items, total, options.limit, options.offset)
    }

    pub fn with_paging(items: Vec<T>, total: u64, limit: Option<usize>, offset: usize) -> Self {
        let has_more = has_more(offset, items.len(), total);
        Self {
            limit: limit.unwrap_or(items.len()),
            offset,
            items,
            total,
            has_more,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn now(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoterProfileResponse {
    #[serde(flatten)]
    pub page: PaginatedResponse<RatedEntity>,
    pub stats: VoterProfileAggregate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateEntityRequest {
    pub id: EntityId,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct ReconfigurePriorRequest {
    pub min_votes: u64,
    pub confidence_k: f64,
}
