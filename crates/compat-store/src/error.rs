//! Error types for the report store.
//!
//! A missing report is not an error: it is [`crate::Fetched::NotFound`].

use std::time::Duration;

use compat_core::CoreError;

/// Report store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Caller asked for something that cannot exist (bad platform, bad date).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Transport failure (connect, timeout, reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// Unexpected HTTP status from the blob source.
    #[error("HTTP {status} for {key}")]
    Http { status: u16, key: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Blob could not be decompressed or parsed.
    #[error("failed to decode {key}: {message}")]
    Decode { key: String, message: String },

    /// Value could not be serialized for storage.
    #[error("failed to encode {key}: {message}")]
    Encode { key: String, message: String },

    /// The caller cancelled the operation.
    #[error("cancelled while fetching {key}")]
    Cancelled { key: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl StoreError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } | Self::Config { .. } => 2,
            Self::Network { .. }
            | Self::Http { .. }
            | Self::RateLimited { .. }
            | Self::Decode { .. }
            | Self::Encode { .. }
            | Self::Cancelled { .. } => 3,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        Self::InvalidInput {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
