pub mod entities;
pub mod pagination;

pub use entities::{EntitySearchParams, parse_entity_query};
pub use pagination::{ListParams, parse_list_options};
