//! Error types for Gantry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Pipeline errors
    #[error("Invalid pipeline definition: {0}")]
    InvalidPipeline(String),

    // Job errors. Command failures and timeouts are job outcomes, not
    // errors; they flow through `JobStatus`.
    #[error("Failed to acquire execution environment: {0}")]
    EnvironmentAcquisitionFailed(String),

    // Cache errors: always degraded to a cold run, never fatal to a job
    #[error("Cache store unavailable: {0}")]
    CacheUnavailable(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
