use crate::database::ListOptions;
use crate::domain::{EntityId, VoterId};

pub fn entity_stats(entity_id: &EntityId) -> String {
    format!("entity_stats:{entity_id}")
}

/// One key per distinct page and ordering of a voter's profile.
pub fn voter_profile(voter_id: &VoterId, options: &ListOptions) -> String {
    let limit = options
        .limit
        .map(|limit| limit.to_string())
        .unwrap_or_else(|| "all".to_string());

    format!(
        "voter_profile:{voter_id}:{limit}:{}:{}:{}",
        options.offset, options.sort_by, options.order
    )
}

/// Glob matching every [`voter_profile`] key of the voter.
pub fn voter_profile_pattern(voter_id: &VoterId) -> String {
    format!("voter_profile:{voter_id}:*")
}

pub fn voter_stats(voter_id: &VoterId) -> String {
    format!("voter_stats:{voter_id}")
}
