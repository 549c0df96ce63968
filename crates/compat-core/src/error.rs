//! Error types for the report model.

/// Errors raised while validating identifiers and report headers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Platform name outside of linux/windows/darwin.
    #[error("invalid platform: {name}")]
    InvalidPlatform { name: String },

    /// Date key that is not `YYYY-MM-DD`.
    #[error("invalid date: {value} (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    /// Month key that is not `YYYY-MM`.
    #[error("invalid month: {value} (expected YYYY-MM)")]
    InvalidMonth { value: String },

    /// Header counters that violate `pass <= total` or `ignore <= total`.
    #[error("invalid counts in {os} report for {date}: pass={pass} ignore={ignore} total={total}")]
    InvalidCounts {
        date: String,
        os: String,
        total: u64,
        pass: u64,
        ignore: u64,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
