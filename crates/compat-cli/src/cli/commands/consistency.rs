//! CLI command: compat consistency
//!
//! Samples every platform's report over the last N days and lists tests
//! that always passed, always failed, were ignored, or flip between the two.

use anyhow::Result;
use chrono::Utc;
use compat_core::{consistency_classify, format_percentage, ConsistencyReport};
use compat_store::{CancellationToken, ReportStore};
use std::collections::BTreeSet;
use std::fmt::Write;

use super::super::args::ConsistencyArgs;
use crate::exit_codes;

pub async fn run(
    store: &ReportStore,
    args: ConsistencyArgs,
    token: &CancellationToken,
) -> Result<i32> {
    let today = Utc::now().date_naive();
    let reports = store.get_trailing_reports(today, args.days, token).await;
    tracing::info!(reports = reports.len(), days = args.days, "reports fetched");
    if reports.is_empty() {
        eprintln!("no reports in the last {} days", args.days);
        return Ok(exit_codes::NOT_FOUND);
    }

    let classified = consistency_classify(reports.iter().map(|r| &**r));
    print!("{}", render(&classified));
    Ok(exit_codes::SUCCESS)
}

fn section(out: &mut String, title: &str, names: &BTreeSet<String>, total: usize) {
    let share = format_percentage(names.len(), total).unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "## {title}({} - {share}):", names.len());
    for name in names {
        let _ = writeln!(out, "- {name}");
    }
}

/// Markdown lists, shares relative to the tests that were never ignored.
pub fn render(report: &ConsistencyReport) -> String {
    let total = report.scored_total();
    let mut out = String::new();
    section(&mut out, "Consistently Passing Tests", &report.passing, total);
    out.push('\n');
    section(&mut out, "Consistently Failing Tests", &report.failing, total);
    out.push('\n');
    section(&mut out, "Ignored Tests", &report.ignored, total);
    out.push('\n');
    section(&mut out, "Flaky Tests", &report.flaky, total);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use compat_core::{Failure, SingleResult, TestReport, TestReportMetadata};
    use std::collections::BTreeMap;

    fn sample(results: &[(&str, SingleResult)]) -> TestReport {
        TestReport {
            metadata: TestReportMetadata {
                date: "2025-04-05".to_string(),
                runtime_version: "2.2.8".to_string(),
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
                target_version: "v23.9.0".to_string(),
                run_id: None,
                total: results.len() as u64,
                pass: 0,
                ignore: 0,
            },
            results: results
                .iter()
                .map(|(name, result)| (name.to_string(), result.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn renders_four_sections() {
        let pass = SingleResult::Pass { options: None };
        let fail = SingleResult::Fail(Failure::Timeout { timeout_ms: 1000 });
        let ignore = SingleResult::Ignore { options: None };
        let one = sample(&[("a", pass.clone()), ("b", fail.clone()), ("c", pass.clone()), ("d", ignore.clone())]);
        let two = sample(&[("a", pass.clone()), ("b", fail.clone()), ("c", fail), ("d", ignore)]);

        let out = render(&consistency_classify([&one, &two]));
        assert_eq!(
            out,
            "## Consistently Passing Tests(1 - 33.33%):\n- a\n\n\
             ## Consistently Failing Tests(1 - 33.33%):\n- b\n\n\
             ## Ignored Tests(1 - 33.33%):\n- d\n\n\
             ## Flaky Tests(1 - 33.33%):\n- c\n"
        );
    }

    #[test]
    fn all_ignored_shares_are_not_available() {
        let only = sample(&[("d", SingleResult::Ignore { options: None })]);
        let out = render(&consistency_classify([&only]));
        assert!(out.contains("## Ignored Tests(1 - N/A):"));
        assert!(out.contains("## Flaky Tests(0 - N/A):"));
    }
}
