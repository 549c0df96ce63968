//! CLI command: compat passing-toml
//!
//! Prints the tests that passed in every sampled report as a TOML `tests`
//! table holding one empty table per test name.

use anyhow::{Context, Result};
use chrono::Utc;
use compat_core::{consistency_classify_filtered, ConsistencyFilter, ConsistencyReport};
use compat_store::{CancellationToken, ReportStore};

use super::super::args::PassingTomlArgs;
use crate::exit_codes;

/// Pass in CI but fail or time out with local debug builds.
pub const DEFAULT_EXCLUDED: &[&str] = &[
    "parallel/test-child-process-send-utf8.js",
    "parallel/test-dgram-connect-send-empty-packet.js",
    "parallel/test-http-agent-maxtotalsockets.js",
    "parallel/test-http-pipeline-requests-connection-leak.js",
    "parallel/test-net-large-string.js",
    "parallel/test-net-write-after-end-nt.js",
    "parallel/test-repl-stdin-push-null.js",
    "parallel/test-fs-read-stream-concurrent-reads.js",
    "parallel/test-vm-global-property-prototype.js",
    "pseudo-tty/test-repl-external-module.js",
];

/// Need network access.
pub const DEFAULT_EXCLUDED_PREFIX: &str = "internet/";

pub async fn run(
    store: &ReportStore,
    args: PassingTomlArgs,
    token: &CancellationToken,
) -> Result<i32> {
    let today = Utc::now().date_naive();
    let reports = store.get_trailing_reports(today, args.days, token).await;
    tracing::info!(reports = reports.len(), days = args.days, "reports fetched");
    if reports.is_empty() {
        eprintln!("no reports in the last {} days", args.days);
        return Ok(exit_codes::NOT_FOUND);
    }

    let filter = build_filter(&args);
    let classified = consistency_classify_filtered(reports.iter().map(|r| &**r), &filter);
    print!("{}", render(&classified).context("failed to render TOML")?);
    Ok(exit_codes::SUCCESS)
}

pub fn build_filter(args: &PassingTomlArgs) -> ConsistencyFilter {
    let mut filter = ConsistencyFilter::new();
    if !args.no_default_excludes {
        for name in DEFAULT_EXCLUDED {
            filter = filter.exclude(*name);
        }
        filter = filter.exclude_prefix(DEFAULT_EXCLUDED_PREFIX);
    }
    for name in &args.exclude {
        filter = filter.exclude(name.clone());
    }
    filter
}

/// `tests` table of names that passed every time and were never ignored.
pub fn render(report: &ConsistencyReport) -> Result<String, toml::ser::Error> {
    let tests: toml::Table = report
        .strictly_passing()
        .map(|name| (name.to_string(), toml::Value::Table(toml::Table::new())))
        .collect();
    let mut root = toml::Table::new();
    root.insert("tests".to_string(), toml::Value::Table(tests));
    toml::to_string(&root)
}
