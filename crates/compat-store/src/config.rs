//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Report store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the report bucket.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of fetches in flight during bulk operations.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of entries per cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Time-to-live of cache entries in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// How many months back to look for non-empty summaries.
    #[serde(default = "default_month_lookback")]
    pub month_lookback: u32,
}

fn default_base_url() -> String {
    "https://dl.deno.land/node-compat-test".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_concurrency() -> usize {
    6
}

fn default_cache_capacity() -> u64 {
    512
}

fn default_cache_ttl() -> u64 {
    60 * 60
}

fn default_month_lookback() -> u32 {
    4
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_concurrency: default_max_concurrency(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
            month_lookback: default_month_lookback(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl StoreConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `COMPAT_REPORTS_URL` | Report bucket base URL |
    /// | `COMPAT_FETCH_TIMEOUT` | Request timeout in seconds (default: 30) |
    /// | `COMPAT_FETCH_MAX_RETRIES` | Max retries for transient failures (default: 3) |
    /// | `COMPAT_FETCH_CONCURRENCY` | Bulk fetch concurrency (default: 6) |
    /// | `COMPAT_CACHE_CAPACITY` | Entries per cache (default: 512) |
    /// | `COMPAT_CACHE_TTL` | Cache TTL in seconds (default: 3600) |
    /// | `COMPAT_MONTH_LOOKBACK` | Months searched for summaries (default: 4) |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("COMPAT_REPORTS_URL").unwrap_or_else(|_| default_base_url()),
            timeout_secs: env_parse("COMPAT_FETCH_TIMEOUT").unwrap_or_else(default_timeout),
            max_retries: env_parse("COMPAT_FETCH_MAX_RETRIES").unwrap_or_else(default_max_retries),
            max_concurrency: env_parse("COMPAT_FETCH_CONCURRENCY")
                .unwrap_or_else(default_max_concurrency),
            cache_capacity: env_parse("COMPAT_CACHE_CAPACITY").unwrap_or_else(default_cache_capacity),
            cache_ttl_secs: env_parse("COMPAT_CACHE_TTL").unwrap_or_else(default_cache_ttl),
            month_lookback: env_parse("COMPAT_MONTH_LOOKBACK")
                .unwrap_or_else(default_month_lookback),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_month_lookback(mut self, months: u32) -> Self {
        self.month_lookback = months;
        self
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_concurrency == 0 {
            return Err(StoreError::Config {
                message: "max_concurrency must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(StoreError::Config {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(StoreError::Config {
                message: format!("base_url must be an http(s) URL: {}", self.base_url),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.base_url, "https://dl.deno.land/node-compat-test");
        assert_eq!(config.max_concurrency, 6);
        assert_eq!(config.month_lookback, 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_and_validate() {
        let config = StoreConfig::default()
            .with_base_url("http://127.0.0.1:9000")
            .with_max_concurrency(2)
            .with_max_retries(0);
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.max_retries, 0);
        config.validate().unwrap();

        assert!(StoreConfig::default().with_max_concurrency(0).validate().is_err());
        assert!(StoreConfig::default().with_base_url("ftp://x").validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_concurrency": 3}"#).unwrap();
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.timeout_secs, 30);
    }
}
