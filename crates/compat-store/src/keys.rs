//! Blob and cache keys.

use compat_core::Platform;

/// `{date}/report-{os}.json.gz`
pub fn report_key(date: &str, platform: Platform) -> String {
    format!("{date}/report-{platform}.json.gz")
}

/// `summary-{month}.json.gz`
pub fn summary_key(month: &str) -> String {
    format!("summary-{month}.json.gz")
}

pub(crate) fn report_cache_key(date: &str, platform: Platform) -> String {
    format!("{date}{platform}")
}
