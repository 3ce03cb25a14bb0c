//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind host")]
    InvalidHost,

    #[error("Invalid upstream URL format")]
    InvalidUpstreamUrl,

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid bus URL format")]
    InvalidBusUrl,

    #[error("Batch size must be between 1 and 1000")]
    InvalidBatchSize,

    #[error("Viewer buffer must be greater than zero")]
    InvalidViewerBuffer,

    #[error("Retry policy needs at least one attempt")]
    InvalidRetryPolicy,
}
