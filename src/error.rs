// src/error.rs
// Infrastructure errors. Classification failures are `FailureRecord` values, not errors.

use thiserror::Error;

/// Main error type for the doggy-detective library
#[derive(Error, Debug)]
pub enum DetectiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid endpoint URL: {0}")]
    Endpoint(String),
}

/// Convenience type alias for Result using DetectiveError
pub type Result<T> = std::result::Result<T, DetectiveError>;
