//! CLI command: compat report
//!
//! Usage:
//!   compat report <date|latest> <linux|windows|darwin> [--json]

use anyhow::{Context, Result};
use compat_core::{format_percentage, TestReport};
use compat_store::{CancellationToken, ReportStore};
use std::fmt::Write;

use super::super::args::ReportArgs;
use crate::exit_codes;

pub async fn run(store: &ReportStore, args: ReportArgs, token: &CancellationToken) -> Result<i32> {
    let Some(report) = super::lookup(store, &args.date, &args.os, token).await? else {
        return Ok(exit_codes::NOT_FOUND);
    };

    if args.json {
        let json = serde_json::to_string_pretty(&*report).context("failed to serialize report")?;
        println!("{json}");
    } else {
        print!("{}", render(&report));
    }
    Ok(exit_codes::SUCCESS)
}

/// Header lines and overall pass rate of a report.
pub fn render(report: &TestReport) -> String {
    let meta = &report.metadata;
    let mut out = String::new();
    let _ = writeln!(out, "date:    {}", meta.date);
    let _ = writeln!(out, "os:      {} ({})", meta.os, meta.arch);
    let _ = writeln!(out, "deno:    {}", meta.runtime_version);
    let _ = writeln!(out, "node:    {}", meta.target_version);
    if let Some(run_id) = &meta.run_id {
        let _ = writeln!(out, "run:     {run_id}");
    }
    let (pass, total) = report.pass_rate();
    let rate = format_percentage(pass, total)
        .unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "passing: {} / {} ({rate})", meta.pass, meta.total);
    if meta.ignore > 0 {
        let _ = writeln!(out, "ignored: {}", meta.ignore);
    }
    out
}
