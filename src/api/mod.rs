pub mod error;
pub mod handlers;
pub mod models;
pub mod parsers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
