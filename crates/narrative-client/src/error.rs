use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No metrics to narrate yet. Distinct from a service failure so callers
    /// can render a "still loading" state instead of an error.
    #[error("No data available for {0}")]
    NoData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NarrativeResult<T> = Result<T, NarrativeError>;
