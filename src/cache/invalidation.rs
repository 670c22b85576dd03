use super::{Cache, keys};
use crate::domain::{EntityId, VoterId};
use crate::errors::CacheError;

pub async fn invalidate_entity(cache: &dyn Cache, entity_id: &EntityId) -> Result<(), CacheError> {
    cache.delete(&[keys::entity_stats(entity_id)]).await
}

/// Drops the voter's summary and every cached page of their profile.
pub async fn invalidate_voter(cache: &dyn Cache, voter_id: &VoterId) -> Result<(), CacheError> {
    cache.delete(&[keys::voter_stats(voter_id)]).await?;
    cache
        .delete_pattern(&keys::voter_profile_pattern(voter_id))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::database::ListOptions;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalidate_voter_leaves_other_voters_alone() {
        let cache = MemoryCache::new();
        let alice = VoterId::from("alice");
        let bob = VoterId::from("bob");
        let ttl = Duration::from_secs(60);

        for voter in [&alice, &bob] {
            cache.set(&keys::voter_stats(voter), "{}".into(), ttl).await.unwrap();
            cache
                .set(&keys::voter_profile(voter, &ListOptions::page(20, 0)), "{}".into(), ttl)
                .await
                .unwrap();
            cache
                .set(&keys::voter_profile(voter, &ListOptions::page(20, 20)), "{}".into(), ttl)
                .await
                .unwrap();
        }

        invalidate_voter(&cache, &alice).await.unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&keys::voter_stats(&bob)).await.unwrap().is_some());
        assert!(cache.get(&keys::voter_stats(&alice)).await.unwrap().is_none());
    }
}
