//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid VIN format: {0}")]
    InvalidFormat(String),

    #[error("Vehicle not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Incomplete valuation data: missing {0}")]
    IncompleteData(String),

    #[error("Billing required: {0}")]
    BillingRequired(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;
