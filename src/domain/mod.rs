pub mod entity;
pub mod ids;
pub mod models;
pub mod shared;
pub mod vote;

pub use entity::Entity;
pub use ids::{EntityId, VoteId, VoterId};
pub use models::{
    Comparison, EnhancedAggregate, EntityRatingAggregate, Histogram, RatedEntity,
    VoterProfileAggregate,
};
pub use shared::{Clock, IdGenerator, SystemClock, UuidGenerator};
pub use vote::Vote;
