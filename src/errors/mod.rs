use thiserror::Error;

/// Rejected input: bad score range, missing references, malformed list parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("score must be between 1 and 5, got {0}")]
    InvalidScore(i64),

    #[error("voter ID cannot be empty")]
    MissingVoter,

    #[error("entity ID cannot be empty")]
    MissingEntity,

    #[error("{0}")]
    InvalidParameter(String),
}

/// Errors surfaced by a vote store or entity catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Errors surfaced by a cache backend. Callers degrade these to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// The only error type that crosses the service boundary.
///
/// `Internal` always carries a generic message; the underlying cause is logged
/// where it happens and never handed to the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn internal(message: &str) -> Self {
        ServiceError::Internal(message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        ServiceError::NotFound(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_keeps_context_chain() {
        let err: StoreError = anyhow::anyhow!("disk I/O error")
            .context("Failed to insert vote")
            .into();

        let message = err.to_string();
        assert!(message.contains("Failed to insert vote"));
        assert!(message.contains("disk I/O error"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err = ServiceError::from(ValidationError::InvalidScore(7));
        assert_eq!(err.to_string(), "score must be between 1 and 5, got 7");
    }
}
