use thiserror::Error;

/// Failures surfaced by the data access layer and provider clients.
///
/// `Clone` is required so a single in-flight request can fan its failure out
/// to every deduplicated waiter.
#[derive(Error, Debug, Clone)]
pub enum DataError {
    #[error("{source_name} error: {message}")]
    Provider { source_name: String, message: String },

    #[error("Empty payload: {0}")]
    EmptyPayload(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl DataError {
    pub fn provider(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::Provider {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
