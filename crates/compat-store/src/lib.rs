//! Fetching and caching of daily node compat test reports.
//!
//! Reports live in a blob store as one gzip-compressed JSON file per day and
//! platform, alongside one summary file per month:
//!
//! ```text
//! {date}/report-{os}.json.gz
//! summary-{month}.json.gz
//! ```
//!
//! [`ReportStore`] is the entry point. It reads through a [`BlobSource`]
//! (HTTP by default, [`MemorySource`] for tests) and caches decoded reports
//! and summaries.
//!
//! ```no_run
//! use compat_core::Platform;
//! use compat_store::ReportStore;
//!
//! # async fn example() -> Result<(), compat_store::StoreError> {
//! let store = ReportStore::from_env()?;
//! if let Some(report) = store.get_report("2025-04-05", Platform::Linux).await {
//!     println!("{} / {}", report.metadata.pass, report.metadata.total);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `COMPAT_REPORTS_URL` | Blob store base URL (default: `https://dl.deno.land/node-compat-test`) |
//! | `COMPAT_FETCH_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `COMPAT_FETCH_MAX_RETRIES` | Max retries for transient failures (default: 3) |
//! | `COMPAT_FETCH_CONCURRENCY` | Max fetches in flight for bulk lookups (default: 6) |
//! | `COMPAT_CACHE_CAPACITY` | Max entries per cache (default: 512) |
//! | `COMPAT_CACHE_TTL` | Cache time-to-live in seconds (default: 3600) |
//! | `COMPAT_MONTH_LOOKBACK` | Months searched for recent summaries (default: 4) |

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod source;
pub mod store;

pub use cache::CachedReport;
pub use codec::{decode_json, encode_json};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use keys::{report_key, summary_key};
pub use source::{BlobSource, HttpSource, MemorySource};
pub use store::{Fetched, ReportStore};

pub use tokio_util::sync::CancellationToken;
