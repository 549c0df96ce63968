//! HTTP blob source: status mapping and retry.
//!
//! This is the ONLY place for status code handling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use super::BlobSource;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

const USER_AGENT_VALUE: &str = concat!("compat-store/", env!("CARGO_PKG_VERSION"));

/// Fetches blobs from `{base_url}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpSource {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| StoreError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    async fn request(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let url = self.url_for(key);
        let mut retries = 0;

        loop {
            match self.request_once(&url, key).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);
                    warn!(
                        error = %e,
                        url = %url,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, url: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        debug!(url = %url, "fetching blob");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => {
                let bytes = response.bytes().await.map_err(|e| StoreError::Network {
                    message: format!("failed to read response body: {}", e),
                })?;
                Ok(Some(bytes.to_vec()))
            }

            404 => {
                debug!(url = %url, "blob not found");
                Ok(None)
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(StoreError::RateLimited { retry_after })
            }

            code => Err(StoreError::Http {
                status: code,
                key: key.to_string(),
            }),
        }
    }
}

/// Delay before retry number `retries` (1-based) after `err`.
///
/// A server-supplied `Retry-After` is honored within +/-10%. Otherwise the
/// delay is drawn uniformly up to `2^retries` seconds. Both are capped at
/// [`MAX_BACKOFF`].
fn backoff_for(err: &StoreError, retries: u32) -> Duration {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    match err {
        StoreError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            let capped = (*retry_after).min(MAX_BACKOFF);
            let factor: f64 = rng.gen_range(0.9..=1.1);
            let ms = (capped.as_millis() as f64 * factor).round() as u64;
            Duration::from_millis(ms.max(100))
        }
        _ => {
            let ceiling = 1u64
                .checked_shl(retries)
                .map_or(MAX_BACKOFF, Duration::from_secs)
                .min(MAX_BACKOFF);
            let ms = rng.gen_range(0..=ceiling.as_millis() as u64);
            Duration::from_millis(ms.max(10))
        }
    }
}

#[async_trait]
impl BlobSource for HttpSource {
    async fn fetch(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.request(key).await
    }
}
