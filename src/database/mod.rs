pub mod connection;
pub mod entities;
pub mod memory;
pub mod models;
pub mod setup;
pub mod sqlite;
pub mod store;
pub mod votes;

pub use connection::{DbConn, DbPool, create_memory_pool, create_pool, get_connection};
pub use memory::{MemoryEntityCatalog, MemoryVoteStore};
pub use models::{EntityQuery, ListOptions, SortColumn, SortOrder};
pub use sqlite::{SqliteEntityCatalog, SqliteVoteStore};
pub use store::{EntityCatalog, VoteStore};
