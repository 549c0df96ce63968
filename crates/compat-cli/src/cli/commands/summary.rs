//! CLI command: compat summary
//!
//! Pass counts per day and platform for the latest months with data.

use anyhow::Result;
use compat_core::{format_percentage, MonthSummary, Platform, TestReportMetadata};
use compat_store::{CancellationToken, ReportStore};
use std::fmt::Write;

use super::super::args::SummaryArgs;
use crate::exit_codes;

pub async fn run(store: &ReportStore, args: SummaryArgs, token: &CancellationToken) -> Result<i32> {
    let summaries = store
        .get_summaries_for_latest_months_with_cancel(args.months.max(1), token)
        .await;
    if summaries.is_empty() {
        eprintln!("no month summaries found");
        return Ok(exit_codes::NOT_FOUND);
    }
    for summary in &summaries {
        print!("{}", render(summary));
    }
    Ok(exit_codes::SUCCESS)
}

fn cell(meta: Option<&TestReportMetadata>) -> String {
    match meta {
        Some(meta) => {
            let (pass, total) = meta.pass_rate();
            let rate = format_percentage(pass, total)
                .unwrap_or_else(|| "N/A".to_string());
            format!("{}/{} ({rate})", meta.pass, meta.total)
        }
        None => "-".to_string(),
    }
}

pub fn render(summary: &MonthSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## {}", summary.month);
    for day in summary.days_sorted() {
        let _ = write!(out, "{}", day.date);
        for platform in Platform::ALL {
            let _ = write!(out, "  {}: {}", platform, cell(day.get(platform)));
        }
        out.push('\n');
    }
    out
}
