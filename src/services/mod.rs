pub mod profile;
pub mod rating;
pub mod server;

pub use profile::{ProfileService, VoterProfile};
pub use rating::{CreateVoteRequest, RatingService, UpdateVoteRequest, VotePage};
pub use server::ServerService;
