pub mod config;

pub use config::PaginationConfig;

/// Whether rows remain after the page that starts at `offset`.
pub fn has_more(offset: usize, returned: usize, total: u64) -> bool {
    (offset.saturating_add(returned) as u64) < total
}
