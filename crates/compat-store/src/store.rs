//! Report store: cached access to daily reports and month summaries.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use compat_core::date::{month_offset, parse_date, parse_month};
use compat_core::{DayReport, DaySummary, MonthSummary, Platform, TestReport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CachedReport, StoreCaches};
use crate::codec::decode_json;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::keys::{report_key, summary_key};
use crate::source::{BlobSource, HttpSource};

/// Outcome of a fetch that completed without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Found(T),
    NotFound,
}

impl<T> Fetched<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetched::Found(_))
    }
}

/// Store of daily test reports and month summaries.
///
/// Cloning is cheap; clones share the source and both caches.
#[derive(Clone)]
pub struct ReportStore {
    source: Arc<dyn BlobSource>,
    caches: StoreCaches,
    config: Arc<StoreConfig>,
}

impl ReportStore {
    pub fn new(source: Arc<dyn BlobSource>, config: StoreConfig) -> Self {
        Self {
            caches: StoreCaches::new(&config),
            source,
            config: Arc::new(config),
        }
    }

    /// Store backed by HTTP with the given configuration.
    pub fn from_config(config: StoreConfig) -> StoreResult<Self> {
        let source = HttpSource::new(&config)?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// Store backed by HTTP, configured from `COMPAT_*` environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_config(StoreConfig::from_env())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fetch one report from the source, bypassing the cache.
    pub async fn fetch_report(
        &self,
        date: &str,
        platform: Platform,
    ) -> StoreResult<Fetched<TestReport>> {
        let key = report_key(date, platform);
        debug!(date = %date, os = %platform, key = %key, "fetching report");

        let Some(bytes) = self.source.fetch(&key).await? else {
            debug!(date = %date, os = %platform, "report not found");
            return Ok(Fetched::NotFound);
        };
        let report: TestReport = decode_json(&key, &bytes)?;
        report
            .metadata
            .validate()
            .map_err(|err| StoreError::Decode {
                key: key.clone(),
                message: err.to_string(),
            })?;
        Ok(Fetched::Found(report))
    }

    /// As [`Self::fetch_report`], returning [`StoreError::Cancelled`] once `token` fires.
    pub async fn fetch_report_with_cancel(
        &self,
        date: &str,
        platform: Platform,
        token: &CancellationToken,
    ) -> StoreResult<Fetched<TestReport>> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(StoreError::Cancelled {
                key: report_key(date, platform),
            }),
            fetched = self.fetch_report(date, platform) => fetched,
        }
    }

    /// Cached report lookup. Fetch errors are logged and yield `None`.
    pub async fn get_report(&self, date: &str, platform: Platform) -> Option<Arc<TestReport>> {
        self.get_report_with_cancel(date, platform, &CancellationToken::new())
            .await
    }

    /// As [`Self::get_report`]; a cancelled lookup yields `None` and is not cached.
    pub async fn get_report_with_cancel(
        &self,
        date: &str,
        platform: Platform,
        token: &CancellationToken,
    ) -> Option<Arc<TestReport>> {
        match self.try_lookup_report(date, platform, token).await {
            Ok(report) => report,
            Err(err) => {
                log_lookup_error(date, platform, &err);
                None
            }
        }
    }

    /// Cache, then source. Found and not-found outcomes are cached, errors are not.
    async fn try_lookup_report(
        &self,
        date: &str,
        platform: Platform,
        token: &CancellationToken,
    ) -> StoreResult<Option<Arc<TestReport>>> {
        if let Some(entry) = self.caches.report(date, platform) {
            debug!(date = %date, os = %platform, "cache hit");
            return Ok(entry.into_report());
        }

        match self.fetch_report_with_cancel(date, platform, token).await? {
            Fetched::Found(report) => {
                let report = Arc::new(report);
                self.caches
                    .put_report(date, platform, CachedReport::Found(Arc::clone(&report)));
                Ok(Some(report))
            }
            Fetched::NotFound => {
                self.caches.put_report(date, platform, CachedReport::NotFound);
                Ok(None)
            }
        }
    }

    /// Validated lookup by date and platform name.
    pub async fn get_report_by_name(
        &self,
        date: &str,
        os: &str,
    ) -> StoreResult<Option<Arc<TestReport>>> {
        self.get_report_by_name_with_cancel(date, os, &CancellationToken::new())
            .await
    }

    pub async fn get_report_by_name_with_cancel(
        &self,
        date: &str,
        os: &str,
        token: &CancellationToken,
    ) -> StoreResult<Option<Arc<TestReport>>> {
        let platform: Platform = os.parse()?;
        parse_date(date)?;
        Ok(self.get_report_with_cancel(date, platform, token).await)
    }

    /// Reports of all three platforms for `date`, fetched concurrently.
    pub async fn get_report_for_date(&self, date: &str) -> DayReport {
        self.get_report_for_date_with_cancel(date, &CancellationToken::new())
            .await
    }

    pub async fn get_report_for_date_with_cancel(
        &self,
        date: &str,
        token: &CancellationToken,
    ) -> DayReport {
        let (linux, windows, darwin) = tokio::join!(
            self.get_report_with_cancel(date, Platform::Linux, token),
            self.get_report_with_cancel(date, Platform::Windows, token),
            self.get_report_with_cancel(date, Platform::Darwin, token),
        );
        DayReport {
            date: date.to_string(),
            linux,
            windows,
            darwin,
        }
    }

    pub async fn get_day_summary(&self, date: &str) -> DaySummary {
        DaySummary::from(&self.get_report_for_date(date).await)
    }

    /// Fetch a month summary from the source. A missing summary is empty.
    pub async fn fetch_month_summary(&self, month: &str) -> StoreResult<MonthSummary> {
        parse_month(month)?;
        let key = summary_key(month);
        debug!(month = %month, key = %key, "fetching month summary");

        match self.source.fetch(&key).await? {
            Some(bytes) => decode_json(&key, &bytes),
            None => {
                debug!(month = %month, "month summary not found");
                Ok(MonthSummary::empty(month))
            }
        }
    }

    /// As [`Self::fetch_month_summary`], returning [`StoreError::Cancelled`] once `token` fires.
    pub async fn fetch_month_summary_with_cancel(
        &self,
        month: &str,
        token: &CancellationToken,
    ) -> StoreResult<MonthSummary> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(StoreError::Cancelled {
                key: summary_key(month),
            }),
            fetched = self.fetch_month_summary(month) => fetched,
        }
    }

    /// Cached month summary. Failures degrade to an empty, uncached summary.
    pub async fn get_month_summary(&self, month: &str) -> Arc<MonthSummary> {
        self.get_month_summary_with_cancel(month, &CancellationToken::new())
            .await
    }

    pub async fn get_month_summary_with_cancel(
        &self,
        month: &str,
        token: &CancellationToken,
    ) -> Arc<MonthSummary> {
        if let Some(summary) = self.caches.summary(month) {
            debug!(month = %month, "cache hit");
            return summary;
        }

        match self.fetch_month_summary_with_cancel(month, token).await {
            Ok(summary) => {
                let summary = Arc::new(summary);
                self.caches.put_summary(month, Arc::clone(&summary));
                summary
            }
            Err(StoreError::Cancelled { .. }) => {
                debug!(month = %month, "month summary fetch cancelled");
                Arc::new(MonthSummary::empty(month))
            }
            Err(err) => {
                warn!(month = %month, error = %err, "failed to fetch month summary");
                Arc::new(MonthSummary::empty(month))
            }
        }
    }

    /// Summary of the month `offset` months before the current one (0 = this month).
    pub async fn get_summary_for_month(&self, offset: u32) -> Arc<MonthSummary> {
        self.get_summary_for_month_at(today(), offset).await
    }

    pub async fn get_summary_for_month_at(&self, today: NaiveDate, offset: u32) -> Arc<MonthSummary> {
        self.summary_for_month(today, offset, &CancellationToken::new())
            .await
    }

    async fn summary_for_month(
        &self,
        today: NaiveDate,
        offset: u32,
        token: &CancellationToken,
    ) -> Arc<MonthSummary> {
        self.get_month_summary_with_cancel(&month_offset(today, offset), token)
            .await
    }

    /// This month's summary, or last month's while this month has no days yet.
    pub async fn get_summary_for_latest_month(&self) -> Arc<MonthSummary> {
        self.get_summary_for_latest_month_at(today()).await
    }

    pub async fn get_summary_for_latest_month_at(&self, today: NaiveDate) -> Arc<MonthSummary> {
        self.latest_month(today, &CancellationToken::new()).await
    }

    pub async fn get_summary_for_latest_month_with_cancel(
        &self,
        token: &CancellationToken,
    ) -> Arc<MonthSummary> {
        self.latest_month(today(), token).await
    }

    async fn latest_month(&self, today: NaiveDate, token: &CancellationToken) -> Arc<MonthSummary> {
        let current = self.summary_for_month(today, 0, token).await;
        if !current.is_empty() {
            return current;
        }
        self.summary_for_month(today, 1, token).await
    }

    /// Up to `n` non-empty summaries, newest first, looking back at most
    /// `month_lookback` months.
    pub async fn get_summaries_for_latest_months(&self, n: usize) -> Vec<Arc<MonthSummary>> {
        self.get_summaries_for_latest_months_at(today(), n).await
    }

    pub async fn get_summaries_for_latest_months_at(
        &self,
        today: NaiveDate,
        n: usize,
    ) -> Vec<Arc<MonthSummary>> {
        self.latest_months(today, n, &CancellationToken::new())
            .await
    }

    pub async fn get_summaries_for_latest_months_with_cancel(
        &self,
        n: usize,
        token: &CancellationToken,
    ) -> Vec<Arc<MonthSummary>> {
        self.latest_months(today(), n, token).await
    }

    async fn latest_months(
        &self,
        today: NaiveDate,
        n: usize,
        token: &CancellationToken,
    ) -> Vec<Arc<MonthSummary>> {
        let mut summaries = Vec::new();
        for offset in 0..self.config.month_lookback {
            if summaries.len() >= n || token.is_cancelled() {
                break;
            }
            let summary = self.summary_for_month(today, offset, token).await;
            if !summary.is_empty() {
                summaries.push(summary);
            }
        }
        summaries
    }

    pub fn get_latest_day_summary<'a>(&self, summary: &'a MonthSummary) -> Option<&'a DaySummary> {
        compat_core::latest_day_summary(summary)
    }

    /// Resolve `"latest"` to the latest summarized day; validate anything else.
    pub async fn resolve_date(&self, date: &str) -> StoreResult<Option<String>> {
        self.resolve_date_with_cancel(date, &CancellationToken::new())
            .await
    }

    pub async fn resolve_date_with_cancel(
        &self,
        date: &str,
        token: &CancellationToken,
    ) -> StoreResult<Option<String>> {
        if date == "latest" {
            let summary = self.get_summary_for_latest_month_with_cancel(token).await;
            return Ok(summary.latest_day().map(|day| day.date.clone()));
        }
        parse_date(date)?;
        Ok(Some(date.to_string()))
    }

    /// Look up many reports with bounded concurrency.
    ///
    /// Results line up with `keys`. Failed or cancelled lookups are `None`.
    pub async fn get_reports_bulk(
        &self,
        keys: &[(String, Platform)],
        token: &CancellationToken,
    ) -> Vec<Option<Arc<TestReport>>> {
        self.lookup_many(keys, token)
            .await
            .into_iter()
            .zip(keys)
            .map(|(result, (date, platform))| match result {
                Ok(report) => report,
                Err(err) => {
                    log_lookup_error(date, *platform, &err);
                    None
                }
            })
            .collect()
    }

    /// One result per key, in key order, at most `max_concurrency` fetches
    /// in flight.
    async fn lookup_many(
        &self,
        keys: &[(String, Platform)],
        token: &CancellationToken,
    ) -> Vec<StoreResult<Option<Arc<TestReport>>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, (date, platform)) in keys.iter().cloned().enumerate() {
            let store = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            tasks.spawn(async move {
                let cancelled = || StoreError::Cancelled {
                    key: report_key(&date, platform),
                };
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => Err(cancelled()),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(_permit) => store.try_lookup_report(&date, platform, &token).await,
                        Err(_) => Err(cancelled()),
                    },
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<StoreResult<Option<Arc<TestReport>>>>> =
            keys.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(err) => warn!(error = %err, "report lookup task failed"),
            }
        }

        slots
            .into_iter()
            .zip(keys)
            .map(|(slot, (date, platform))| {
                slot.unwrap_or_else(|| {
                    Err(StoreError::Network {
                        message: format!("lookup of {} did not complete", report_key(date, *platform)),
                    })
                })
            })
            .collect()
    }

    /// Reports of the `days` days before `today` on every platform. Missing
    /// reports are skipped.
    pub async fn get_trailing_reports(
        &self,
        today: NaiveDate,
        days: u64,
        token: &CancellationToken,
    ) -> Vec<Arc<TestReport>> {
        let keys: Vec<(String, Platform)> = (1..=days)
            .map(|n| compat_core::date::days_ago(today, n))
            .flat_map(|date| Platform::ALL.iter().map(move |platform| (date.clone(), *platform)))
            .collect();
        self.get_reports_bulk(&keys, token)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Compute the summary of `date` and merge it into `summary`.
    pub async fn add_day_summary(&self, summary: &mut MonthSummary, date: &str) {
        summary.insert(self.get_day_summary(date).await);
    }

    /// Stored summary of `month` with the given dates recomputed and merged in.
    ///
    /// Unlike the lookups above, any fetch failure other than a missing
    /// report fails the whole build.
    pub async fn build_month_summary(
        &self,
        month: &str,
        dates: &[String],
        token: &CancellationToken,
    ) -> StoreResult<MonthSummary> {
        for date in dates {
            parse_date(date)?;
            if !date.starts_with(month) || date.as_bytes().get(month.len()) != Some(&b'-') {
                return Err(StoreError::InvalidInput {
                    message: format!("date {date} is not in month {month}"),
                });
            }
        }

        let mut summary = self.fetch_month_summary_with_cancel(month, token).await?;

        let keys: Vec<(String, Platform)> = dates
            .iter()
            .flat_map(|date| Platform::ALL.iter().map(move |platform| (date.clone(), *platform)))
            .collect();
        let reports = self
            .lookup_many(&keys, token)
            .await
            .into_iter()
            .collect::<StoreResult<Vec<_>>>()?;
        let mut reports = reports.into_iter();

        for date in dates {
            let mut day = DayReport::new(date.clone());
            for platform in Platform::ALL {
                day.set(platform, reports.next().flatten());
            }
            debug!(month = %month, date = %date, "merging day summary");
            summary.insert(DaySummary::from(&day));
        }
        Ok(summary)
    }

    /// Drop every cached report and summary.
    pub fn invalidate_all(&self) {
        self.caches.clear();
    }
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore")
            .field("config", &self.config)
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn log_lookup_error(date: &str, platform: Platform, err: &StoreError) {
    match err {
        StoreError::Cancelled { .. } => debug!(date = %date, os = %platform, "report fetch cancelled"),
        _ => warn!(date = %date, os = %platform, error = %err, "failed to fetch report"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use compat_core::{Failure, SingleResult, TestReportMetadata};

    use super::*;
    use crate::source::MemorySource;

    fn report(date: &str, os: &str, passing: &[&str], failing: &[&str]) -> TestReport {
        let mut results = BTreeMap::new();
        for name in passing {
            results.insert(name.to_string(), SingleResult::Pass { options: None });
        }
        for name in failing {
            results.insert(
                name.to_string(),
                SingleResult::Fail(Failure::Exit {
                    code: 1,
                    stderr: "error: Uncaught boom".to_string(),
                }),
            );
        }
        TestReport {
            metadata: TestReportMetadata {
                date: date.to_string(),
                runtime_version: "2.2.8".to_string(),
                os: os.to_string(),
                arch: "x86_64".to_string(),
                target_version: "v23.9.0".to_string(),
                run_id: None,
                total: (passing.len() + failing.len()) as u64,
                pass: passing.len() as u64,
                ignore: 0,
            },
            results,
        }
    }

    fn seed_report(source: &MemorySource, date: &str, platform: Platform) {
        let value = report(date, platform.as_str(), &["parallel/test-a.js"], &["parallel/test-b.js"]);
        source
            .insert_json(&report_key(date, platform), &value)
            .unwrap();
    }

    fn seed_month(source: &MemorySource, month: &str, dates: &[&str]) {
        let mut summary = MonthSummary::empty(month);
        for date in dates {
            summary.insert(DaySummary {
                date: date.to_string(),
                windows: None,
                linux: Some(report(date, "linux", &["a"], &[]).metadata),
                darwin: None,
            });
        }
        source.insert_json(&summary_key(month), &summary).unwrap();
    }

    fn store_with(source: Arc<MemorySource>) -> ReportStore {
        ReportStore::new(source, StoreConfig::default())
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_report_found_and_not_found() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(source);

        let found = store.fetch_report("2025-04-05", Platform::Linux).await.unwrap();
        let found = found.found().unwrap();
        assert_eq!(found.metadata.total, 2);
        assert_eq!(found.metadata.pass, 1);

        let missing = store.fetch_report("2025-04-05", Platform::Darwin).await.unwrap();
        assert_eq!(missing, Fetched::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_report_decode_error_is_err() {
        let source = Arc::new(MemorySource::new());
        source.insert(report_key("2025-04-05", Platform::Linux), b"{not json".to_vec());
        let store = store_with(source);

        let err = store.fetch_report("2025-04-05", Platform::Linux).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_report_rejects_inconsistent_counts() {
        let source = Arc::new(MemorySource::new());
        let mut value = report("2025-04-05", "linux", &["a"], &[]);
        value.metadata.pass = 5;
        source
            .insert_json(&report_key("2025-04-05", Platform::Linux), &value)
            .unwrap();
        let store = store_with(source);

        let err = store.fetch_report("2025-04-05", Platform::Linux).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_get_report_caches_found_and_not_found() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(Arc::clone(&source));

        assert!(store.get_report("2025-04-05", Platform::Linux).await.is_some());
        assert!(store.get_report("2025-04-05", Platform::Linux).await.is_some());
        assert!(store.get_report("2025-04-05", Platform::Windows).await.is_none());
        assert!(store.get_report("2025-04-05", Platform::Windows).await.is_none());
        assert_eq!(source.fetch_count(), 2);

        store.invalidate_all();
        assert!(store.get_report("2025-04-05", Platform::Linux).await.is_some());
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_get_report_does_not_cache_errors() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let key = report_key("2025-04-05", Platform::Linux);
        source.fail_key(key.clone());
        let store = store_with(Arc::clone(&source));

        assert!(store.get_report("2025-04-05", Platform::Linux).await.is_none());
        source.heal_key(&key);
        assert!(store.get_report("2025-04-05", Platform::Linux).await.is_some());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(Arc::clone(&source));
        let other = store.clone();

        store.get_report("2025-04-05", Platform::Linux).await;
        other.get_report("2025-04-05", Platform::Linux).await;
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_report_with_cancel() {
        let source = Arc::new(MemorySource::new().with_latency(Duration::from_secs(30)));
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(source);
        let token = CancellationToken::new();
        token.cancel();

        let err = store
            .fetch_report_with_cancel("2025-04-05", Platform::Linux, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_lookup_is_absent_and_not_cached() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(Arc::clone(&source));
        let token = CancellationToken::new();
        token.cancel();

        let day = store
            .get_report_for_date_with_cancel("2025-04-05", &token)
            .await;
        assert!(day.linux.is_none());
        assert!(day.windows.is_none());
        assert!(day.darwin.is_none());
        assert_eq!(source.fetch_count(), 0);

        let day = store.get_report_for_date("2025-04-05").await;
        assert!(day.linux.is_some());
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_month_summary_is_not_cached() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-04", &["2025-04-01"]);
        let store = store_with(Arc::clone(&source));
        let token = CancellationToken::new();
        token.cancel();

        assert!(store
            .get_month_summary_with_cancel("2025-04", &token)
            .await
            .is_empty());
        assert_eq!(store.resolve_date_with_cancel("latest", &token).await.unwrap(), None);
        assert_eq!(store.get_month_summary("2025-04").await.reports.len(), 1);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_get_report_by_name_validates_input() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Darwin);
        let store = store_with(Arc::clone(&source));

        let found = store.get_report_by_name("2025-04-05", "darwin").await.unwrap();
        assert!(found.is_some());

        let err = store.get_report_by_name("2025-04-05", "freebsd").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
        let err = store.get_report_by_name("yesterday", "linux").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_get_report_for_date_degrades_per_platform() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        seed_report(&source, "2025-04-05", Platform::Darwin);
        source.fail_key(report_key("2025-04-05", Platform::Darwin));
        let store = store_with(source);

        let day = store.get_report_for_date("2025-04-05").await;
        assert!(day.linux.is_some());
        assert!(day.windows.is_none());
        assert!(day.darwin.is_none());

        let summary = store.get_day_summary("2025-04-05").await;
        assert_eq!(summary.date, "2025-04-05");
        assert_eq!(summary.linux.map(|meta| meta.pass), Some(1));
    }

    #[tokio::test]
    async fn test_month_summary_missing_is_empty_and_cached() {
        let source = Arc::new(MemorySource::new());
        let store = store_with(Arc::clone(&source));

        let summary = store.get_month_summary("2025-04").await;
        assert!(summary.is_empty());
        assert_eq!(summary.month, "2025-04");
        store.get_month_summary("2025-04").await;
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_month_summary_errors_are_not_cached() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-04", &["2025-04-01"]);
        source.fail_key(summary_key("2025-04"));
        let store = store_with(Arc::clone(&source));

        assert!(store.fetch_month_summary("2025-04").await.is_err());
        assert!(store.get_month_summary("2025-04").await.is_empty());
        source.heal_key(&summary_key("2025-04"));
        assert_eq!(store.get_month_summary("2025-04").await.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_month_summary_rejects_bad_month() {
        let store = store_with(Arc::new(MemorySource::new()));
        let err = store.fetch_month_summary("2025-4").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_latest_month_falls_back_to_previous() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-03", &["2025-03-30", "2025-03-31"]);
        let store = store_with(source);

        let summary = store.get_summary_for_latest_month_at(d(2025, 4, 1)).await;
        assert_eq!(summary.month, "2025-03");
        assert_eq!(store.get_latest_day_summary(&summary).unwrap().date, "2025-03-31");
    }

    #[tokio::test]
    async fn test_latest_month_prefers_current() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-03", &["2025-03-31"]);
        seed_month(&source, "2025-04", &["2025-04-01"]);
        let store = store_with(source);

        let summary = store.get_summary_for_latest_month_at(d(2025, 4, 30)).await;
        assert_eq!(summary.month, "2025-04");
    }

    #[tokio::test]
    async fn test_summaries_for_latest_months_respects_lookback() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-04", &["2025-04-01"]);
        seed_month(&source, "2025-02", &["2025-02-01"]);
        seed_month(&source, "2024-12", &["2024-12-01"]);
        let store = store_with(Arc::clone(&source));
        let today = d(2025, 4, 10);

        let months: Vec<String> = store
            .get_summaries_for_latest_months_at(today, 2)
            .await
            .iter()
            .map(|s| s.month.clone())
            .collect();
        assert_eq!(months, vec!["2025-04", "2025-02"]);

        // 2024-12 is five months back, past the default lookback of four
        let months = store.get_summaries_for_latest_months_at(today, 10).await;
        assert_eq!(months.len(), 2);

        let wide = ReportStore::new(source, StoreConfig::default().with_month_lookback(6));
        assert_eq!(wide.get_summaries_for_latest_months_at(today, 10).await.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_date() {
        let source = Arc::new(MemorySource::new());
        let store = store_with(Arc::clone(&source));

        assert_eq!(
            store.resolve_date("2025-04-05").await.unwrap(),
            Some("2025-04-05".to_string())
        );
        assert!(matches!(
            store.resolve_date("04/05/2025").await,
            Err(StoreError::InvalidInput { .. })
        ));
        assert_eq!(store.resolve_date("latest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bulk_preserves_order_and_caps_concurrency() {
        let source = Arc::new(MemorySource::new().with_latency(Duration::from_millis(20)));
        let mut keys = Vec::new();
        for day in 1..=8 {
            let date = format!("2025-04-{day:02}");
            for platform in Platform::ALL {
                if day % 2 == 0 {
                    seed_report(&source, &date, platform);
                }
                keys.push((date.clone(), platform));
            }
        }
        let config = StoreConfig::default().with_max_concurrency(3);
        let store = ReportStore::new(source.clone(), config);

        let results = store.get_reports_bulk(&keys, &CancellationToken::new()).await;
        assert_eq!(results.len(), keys.len());
        for ((date, platform), result) in keys.iter().zip(&results) {
            let expect_found = date.ends_with(['2', '4', '6', '8']);
            assert_eq!(result.is_some(), expect_found, "{date} {platform}");
            if let Some(report) = result {
                assert_eq!(&report.metadata.date, date);
                assert_eq!(report.metadata.os, platform.as_str());
            }
        }
        assert!(source.max_in_flight() <= 3);
        assert_eq!(source.fetch_count(), keys.len());
    }

    #[tokio::test]
    async fn test_bulk_after_cancel_yields_none() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Linux);
        let store = store_with(Arc::clone(&source));
        let token = CancellationToken::new();
        token.cancel();

        let keys = vec![("2025-04-05".to_string(), Platform::Linux)];
        let results = store.get_reports_bulk(&keys, &token).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_trailing_reports_skip_missing() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-03-31", Platform::Linux);
        seed_report(&source, "2025-03-30", Platform::Windows);
        seed_report(&source, "2025-04-01", Platform::Linux);
        let store = store_with(source);

        let reports = store
            .get_trailing_reports(d(2025, 4, 1), 2, &CancellationToken::new())
            .await;
        let mut dates: Vec<&str> = reports.iter().map(|r| r.metadata.date.as_str()).collect();
        dates.sort_unstable();
        assert_eq!(dates, vec!["2025-03-30", "2025-03-31"]);
    }

    #[tokio::test]
    async fn test_add_day_summary() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-05", Platform::Windows);
        let store = store_with(source);
        let mut summary = MonthSummary::empty("2025-04");

        store.add_day_summary(&mut summary, "2025-04-05").await;
        let day = summary.reports.get("2025-04-05").unwrap();
        assert!(day.windows.is_some());
        assert!(day.linux.is_none());
    }

    #[tokio::test]
    async fn test_build_month_summary_merges_into_stored() {
        let source = Arc::new(MemorySource::new());
        seed_month(&source, "2025-04", &["2025-04-01", "2025-04-02"]);
        seed_report(&source, "2025-04-02", Platform::Darwin);
        seed_report(&source, "2025-04-03", Platform::Linux);
        let store = store_with(source);

        let dates = vec!["2025-04-02".to_string(), "2025-04-03".to_string()];
        let summary = store
            .build_month_summary("2025-04", &dates, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.month, "2025-04");
        assert_eq!(summary.reports.len(), 3);
        let replaced = summary.reports.get("2025-04-02").unwrap();
        assert!(replaced.darwin.is_some());
        assert!(replaced.linux.is_none());
        assert!(summary.reports.get("2025-04-03").unwrap().linux.is_some());
        assert!(summary.reports.get("2025-04-01").unwrap().linux.is_some());
    }

    #[tokio::test]
    async fn test_build_month_summary_fails_on_fetch_error() {
        let source = Arc::new(MemorySource::new());
        seed_report(&source, "2025-04-02", Platform::Linux);
        seed_report(&source, "2025-04-02", Platform::Windows);
        source.fail_key(report_key("2025-04-02", Platform::Windows));
        let store = store_with(Arc::clone(&source));

        let dates = vec!["2025-04-02".to_string()];
        let err = store
            .build_month_summary("2025-04", &dates, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Network { .. }));

        // the failure is not remembered as a missing report
        source.heal_key(&report_key("2025-04-02", Platform::Windows));
        let summary = store
            .build_month_summary("2025-04", &dates, &CancellationToken::new())
            .await
            .unwrap();
        assert!(summary.reports.get("2025-04-02").unwrap().windows.is_some());
    }

    #[tokio::test]
    async fn test_build_month_summary_rejects_foreign_dates() {
        let store = store_with(Arc::new(MemorySource::new()));
        let dates = vec!["2025-05-01".to_string()];
        let err = store
            .build_month_summary("2025-04", &dates, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_build_month_summary_cancelled() {
        let store = store_with(Arc::new(MemorySource::new()));
        let token = CancellationToken::new();
        token.cancel();
        let dates = vec!["2025-04-01".to_string()];
        let err = store
            .build_month_summary("2025-04", &dates, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled { .. }));
    }
}
