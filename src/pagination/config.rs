/// Limits applied to list endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl PaginationConfig {
    pub fn new() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }

    pub fn with_max_limit(mut self, max: usize) -> Self {
        self.max_limit = max;
        self.default_limit = self.default_limit.min(max);
        self
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::new()
    }
}
