//! CLI command: compat build-summary
//!
//! Usage:
//!   compat build-summary 2025-04 [2025-04-03 2025-04-04] --out summary-2025-04.json.gz
//!
//! Starts from the published summary of the month, recomputes the given days
//! from their reports and writes the merged summary as gzip-compressed JSON.
//! Without explicit dates every day of the month up to today is recomputed,
//! and days with no report on any platform are left out.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use compat_core::date::dates_in_month;
use compat_core::Platform;
use compat_store::{encode_json, summary_key, CancellationToken, ReportStore};

use super::super::args::BuildSummaryArgs;
use crate::exit_codes;

pub async fn run(
    store: &ReportStore,
    args: BuildSummaryArgs,
    token: &CancellationToken,
) -> Result<i32> {
    let defaulted = args.dates.is_empty();
    let dates = if defaulted {
        month_dates_until(&args.month, Utc::now().date_naive())?
    } else {
        args.dates.clone()
    };

    let mut summary = store.build_month_summary(&args.month, &dates, token).await?;
    if defaulted {
        summary
            .reports
            .retain(|_, day| Platform::ALL.iter().any(|p| day.get(*p).is_some()));
    }

    let key = summary_key(&args.month);
    let bytes = encode_json(&key, &summary)?;
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    tracing::info!(
        month = %args.month,
        days = summary.reports.len(),
        path = %args.out.display(),
        "wrote month summary"
    );
    Ok(exit_codes::SUCCESS)
}

/// Days of `month` up to and including `today`.
fn month_dates_until(month: &str, today: NaiveDate) -> Result<Vec<String>> {
    let today = compat_core::date::date_key(today);
    let mut dates = dates_in_month(month).map_err(compat_store::StoreError::from)?;
    dates.retain(|date| *date <= today);
    Ok(dates)
}
