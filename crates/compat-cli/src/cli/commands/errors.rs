//! CLI command: compat errors
//!
//! Groups exit failures by their first stderr line, most frequent first.

use anyhow::Result;
use compat_core::error_histogram;
use compat_store::{CancellationToken, ReportStore};
use std::fmt::Write;

use super::super::args::ErrorsArgs;
use crate::exit_codes;

pub async fn run(store: &ReportStore, args: ErrorsArgs, token: &CancellationToken) -> Result<i32> {
    let Some(report) = super::lookup(store, &args.date, &args.os, token).await? else {
        return Ok(exit_codes::NOT_FOUND);
    };
    let histogram = error_histogram(&report);
    print!("{}", render(&histogram, args.top));
    Ok(exit_codes::SUCCESS)
}

/// One `(count) message` line per distinct message.
pub fn render(histogram: &[(String, usize)], top: Option<usize>) -> String {
    let mut out = String::new();
    for (message, count) in histogram.iter().take(top.unwrap_or(usize::MAX)) {
        let _ = writeln!(out, "({count}) {message}");
    }
    out
}
