//! Error types for the application

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing channel or column: {0}")]
    MissingChannel(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown tariff code: {0}")]
    UnknownTariff(String),

    #[error("Unknown rate period: {0}")]
    UnknownPeriod(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
