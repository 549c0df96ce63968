use super::args::*;

pub mod build_summary;
pub mod categories;
pub mod consistency;
pub mod errors;
pub mod passing_toml;
pub mod report;
pub mod summary;

use std::sync::Arc;

use anyhow::Result;
use compat_core::TestReport;
use compat_store::{CancellationToken, ReportStore, StoreConfig};

pub async fn dispatch(cli: Cli, token: CancellationToken) -> Result<i32> {
    let store = build_store(&cli.global)?;
    match cli.cmd {
        Command::Report(args) => report::run(&store, args, &token).await,
        Command::Errors(args) => errors::run(&store, args, &token).await,
        Command::Categories(args) => categories::run(&store, args, &token).await,
        Command::Summary(args) => summary::run(&store, args, &token).await,
        Command::Consistency(args) => consistency::run(&store, args, &token).await,
        Command::PassingToml(args) => passing_toml::run(&store, args, &token).await,
        Command::BuildSummary(args) => build_summary::run(&store, args, &token).await,
    }
}

/// Environment configuration with command-line overrides applied.
pub fn store_config(global: &GlobalArgs) -> StoreConfig {
    let mut config = StoreConfig::from_env();
    if let Some(url) = &global.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(n) = global.concurrency {
        config = config.with_max_concurrency(n);
    }
    config
}

fn build_store(global: &GlobalArgs) -> Result<ReportStore> {
    Ok(ReportStore::from_config(store_config(global))?)
}

/// Resolve `date` (or `latest`) and look up the report of platform `os`.
/// `None` once the missing data was reported on stderr.
pub(crate) async fn lookup(
    store: &ReportStore,
    date: &str,
    os: &str,
    token: &CancellationToken,
) -> Result<Option<Arc<TestReport>>> {
    let Some(date) = resolve(store, date, token).await? else {
        return Ok(None);
    };
    let report = store.get_report_by_name_with_cancel(&date, os, token).await?;
    if report.is_none() {
        eprintln!("no {os} report for {date}");
    }
    Ok(report)
}

/// Resolve `date` (or `latest`). `None` once "no data" was reported.
pub(crate) async fn resolve(
    store: &ReportStore,
    date: &str,
    token: &CancellationToken,
) -> Result<Option<String>> {
    let resolved = store.resolve_date_with_cancel(date, token).await?;
    if resolved.is_none() {
        eprintln!("no reports available yet");
    }
    Ok(resolved)
}
