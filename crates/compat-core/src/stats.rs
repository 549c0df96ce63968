//! Pass-rate statistics over subsets of tests and across report samples.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::category::{split_by_category, Category};
use crate::model::{DayReport, Failure, Outcome, Platform, TestReport};

/// Which tests count toward the denominator of a subset rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenominatorPolicy {
    /// Only tests that passed or failed. Ignored and missing tests are out of scope.
    #[default]
    Decided,
    /// Every requested name, whether or not it ran.
    NamedSubset,
}

/// Counters for one subset of one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SubsetRate {
    pub pass: usize,
    pub fail: usize,
    pub ignored: usize,
    /// Requested names absent from the report.
    pub missing: usize,
    /// Denominator under the policy the rate was computed with.
    pub total: usize,
}

impl SubsetRate {
    /// Size of the requested subset.
    pub fn named(&self) -> usize {
        self.pass + self.fail + self.ignored + self.missing
    }

    /// Tests with a pass or fail outcome.
    pub fn decided(&self) -> usize {
        self.pass + self.fail
    }

    /// `pass / total * 100`, or `None` when the denominator is zero.
    pub fn percentage(&self) -> Option<f64> {
        percentage(self.pass, self.total)
    }

    /// Two-decimal percentage, `N/A` when the denominator is zero.
    pub fn percentage_label(&self) -> String {
        format_percentage(self.pass, self.total).unwrap_or_else(|| "N/A".to_string())
    }
}

pub fn percentage(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(part as f64 / total as f64 * 100.0)
}

/// Format `part / total` as `12.34%`. `None` when `total == 0`.
pub fn format_percentage(part: usize, total: usize) -> Option<String> {
    percentage(part, total).map(|p| format!("{p:.2}%"))
}

/// Pass rate of `names` in `report`, ignored and missing tests excluded from
/// the denominator.
pub fn rate_for_subset<S: AsRef<str>>(
    report: Option<&TestReport>,
    names: &[S],
) -> Option<SubsetRate> {
    rate_for_subset_with(report, names, DenominatorPolicy::Decided)
}

pub fn rate_for_subset_with<S: AsRef<str>>(
    report: Option<&TestReport>,
    names: &[S],
    policy: DenominatorPolicy,
) -> Option<SubsetRate> {
    let report = report?;
    let mut rate = SubsetRate::default();
    for name in names {
        match report.result(name.as_ref()).map(|r| r.outcome()) {
            Some(Outcome::Pass) => rate.pass += 1,
            Some(Outcome::Fail) => rate.fail += 1,
            Some(Outcome::Ignore) => rate.ignored += 1,
            None => rate.missing += 1,
        }
    }
    rate.total = match policy {
        DenominatorPolicy::Decided => rate.decided(),
        DenominatorPolicy::NamedSubset => rate.named(),
    };
    Some(rate)
}

/// Long-run behaviour of every test seen across a window of samples.
///
/// The sets are independent predicates and may overlap: a test that was
/// ignored once and passed otherwise is both `ignored` and `passing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// No failure and at least one pass.
    pub passing: BTreeSet<String>,
    /// Every recorded outcome is a failure.
    pub failing: BTreeSet<String>,
    /// At least one pass and at least one failure.
    pub flaky: BTreeSet<String>,
    /// Ignored in at least one sample.
    pub ignored: BTreeSet<String>,
    #[serde(skip)]
    outcomes: BTreeMap<String, Vec<Outcome>>,
}

impl ConsistencyReport {
    /// Number of distinct test names observed.
    pub fn observed(&self) -> usize {
        self.outcomes.len()
    }

    /// Observed names that were never ignored.
    pub fn scored_total(&self) -> usize {
        self.observed() - self.ignored.len()
    }

    /// Passing names that were never ignored.
    pub fn strictly_passing(&self) -> impl Iterator<Item = &str> {
        self.passing
            .iter()
            .filter(|name| !self.ignored.contains(*name))
            .map(String::as_str)
    }

    /// Recorded outcomes for `name`, one per sample it appeared in.
    pub fn outcomes(&self, name: &str) -> Option<&[Outcome]> {
        self.outcomes.get(name).map(Vec::as_slice)
    }
}

/// Names left out of a consistency report.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyFilter {
    pub excluded: BTreeSet<String>,
    pub excluded_prefixes: Vec<String>,
}

impl ConsistencyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.insert(name.into());
        self
    }

    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    pub fn allows(&self, name: &str) -> bool {
        !self.excluded.contains(name)
            && !self
                .excluded_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

pub fn consistency_classify<'a, I>(samples: I) -> ConsistencyReport
where
    I: IntoIterator<Item = &'a TestReport>,
{
    consistency_classify_filtered(samples, &ConsistencyFilter::default())
}

pub fn consistency_classify_filtered<'a, I>(
    samples: I,
    filter: &ConsistencyFilter,
) -> ConsistencyReport
where
    I: IntoIterator<Item = &'a TestReport>,
{
    let mut outcomes: BTreeMap<String, Vec<Outcome>> = BTreeMap::new();
    let mut sample_count = 0usize;
    let mut skipped = 0usize;
    for report in samples {
        sample_count += 1;
        for (name, result) in &report.results {
            if !filter.allows(name) {
                skipped += 1;
                continue;
            }
            outcomes
                .entry(name.clone())
                .or_default()
                .push(result.outcome());
        }
    }

    let mut report = ConsistencyReport::default();
    for (name, seen) in &outcomes {
        let any_pass = seen.contains(&Outcome::Pass);
        let any_fail = seen.contains(&Outcome::Fail);
        if seen.contains(&Outcome::Ignore) {
            report.ignored.insert(name.clone());
        }
        if any_pass && any_fail {
            report.flaky.insert(name.clone());
        }
        if any_pass && !any_fail {
            report.passing.insert(name.clone());
        }
        if seen.iter().all(|o| *o == Outcome::Fail) {
            report.failing.insert(name.clone());
        }
    }
    debug!(
        samples = sample_count,
        tests = outcomes.len(),
        skipped,
        "classified test consistency"
    );
    report.outcomes = outcomes;
    report
}

/// Pass rates of one category on every platform of a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub category: Category,
    pub tests: usize,
    pub linux: Option<SubsetRate>,
    pub windows: Option<SubsetRate>,
    pub darwin: Option<SubsetRate>,
}

impl CategoryRow {
    pub fn get(&self, platform: Platform) -> Option<&SubsetRate> {
        match platform {
            Platform::Linux => self.linux.as_ref(),
            Platform::Windows => self.windows.as_ref(),
            Platform::Darwin => self.darwin.as_ref(),
        }
    }
}

/// Per-category pass rates of a day, categories sorted by name.
pub fn category_breakdown(day: &DayReport, policy: DenominatorPolicy) -> Vec<CategoryRow> {
    split_by_category(day.test_names())
        .into_iter()
        .map(|(category, names)| {
            let rate = |platform: Platform| {
                rate_for_subset_with(day.get(platform).map(|r| &**r), names.as_slice(), policy)
            };
            CategoryRow {
                category,
                tests: names.len(),
                linux: rate(Platform::Linux),
                windows: rate(Platform::Windows),
                darwin: rate(Platform::Darwin),
            }
        })
        .collect()
}

const UNCAUGHT_PREFIXES: [&str; 2] = ["error: Uncaught (in promise) ", "error: Uncaught "];

/// First stderr line of an exit failure, without the uncaught-error prefix.
pub fn error_headline(stderr: &str) -> &str {
    let line = stderr.split('\n').next().unwrap_or("");
    UNCAUGHT_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .unwrap_or(line)
}

/// Count exit failures by headline, most frequent first.
pub fn error_histogram(report: &TestReport) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for result in report.results.values() {
        if let Some(Failure::Exit { stderr, .. }) = result.failure() {
            *counts.entry(error_headline(stderr)).or_default() += 1;
        }
    }
    let mut entries: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(headline, count)| (headline.to_string(), count))
        .collect();
    // BTreeMap order makes ties alphabetical; the sort is stable
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}
