//! In-memory caches for reports and month summaries.
//!
//! Entries expire after a TTL and are evicted when the cache is full. Losing
//! an entry only costs a re-fetch.

use std::sync::Arc;
use std::time::Duration;

use compat_core::{MonthSummary, Platform, TestReport};
use moka::sync::Cache;

use crate::config::StoreConfig;
use crate::keys::report_cache_key;

/// Cached outcome of a report fetch. Absence is cached too.
#[derive(Debug, Clone)]
pub enum CachedReport {
    Found(Arc<TestReport>),
    NotFound,
}

impl CachedReport {
    pub fn into_report(self) -> Option<Arc<TestReport>> {
        match self {
            CachedReport::Found(report) => Some(report),
            CachedReport::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct StoreCaches {
    reports: Cache<String, CachedReport>,
    summaries: Cache<String, Arc<MonthSummary>>,
}

impl StoreCaches {
    pub fn new(config: &StoreConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs.max(1));
        Self {
            reports: Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(ttl)
                .build(),
            summaries: Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn report(&self, date: &str, platform: Platform) -> Option<CachedReport> {
        self.reports.get(&report_cache_key(date, platform))
    }

    pub fn put_report(&self, date: &str, platform: Platform, entry: CachedReport) {
        self.reports.insert(report_cache_key(date, platform), entry);
    }

    pub fn summary(&self, month: &str) -> Option<Arc<MonthSummary>> {
        self.summaries.get(month)
    }

    pub fn put_summary(&self, month: &str, summary: Arc<MonthSummary>) {
        self.summaries.insert(month.to_string(), summary);
    }

    pub fn clear(&self) {
        self.reports.invalidate_all();
        self.summaries.invalidate_all();
    }
}

impl std::fmt::Debug for StoreCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCaches")
            .field("reports", &self.reports.entry_count())
            .field("summaries", &self.summaries.entry_count())
            .finish()
    }
}
