//! Test report model.
//!
//! Reports are produced by the upstream test runner, one per platform per day,
//! and stored as gzip-compressed JSON. Everything here is a plain value type;
//! the store hands out `Arc<TestReport>` snapshots and nobody mutates them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::date::parse_date;
use crate::error::{CoreError, CoreResult};

/// Operating system a report was produced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    Darwin,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Windows, Platform::Darwin];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Darwin => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "darwin" => Ok(Platform::Darwin),
            other => Err(CoreError::InvalidPlatform {
                name: other.to_string(),
            }),
        }
    }
}

/// Optional metadata about how a test was run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// The test file was executed through the `node:test` harness.
    #[serde(default)]
    pub uses_node_test: bool,
}

/// Why a test failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Failure {
    /// Process exited with a non-zero code.
    Exit {
        code: i32,
        #[serde(default)]
        stderr: String,
    },
    /// Exceeded the time budget.
    Timeout {
        #[serde(rename = "timeout")]
        timeout_ms: u64,
    },
    /// Anything else.
    Unexpected { message: String },
}

/// Outcome tag of a [`SingleResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Pass,
    Fail,
    Ignore,
}

/// Result of one test on one platform on one day.
///
/// On the wire this is `[status, error?, options?]` where `status` is `true`,
/// `false` or `"IGNORE"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleResult {
    Pass { options: Option<RunOptions> },
    Ignore { options: Option<RunOptions> },
    Fail(Failure),
}

impl SingleResult {
    pub fn outcome(&self) -> Outcome {
        match self {
            SingleResult::Pass { .. } => Outcome::Pass,
            SingleResult::Ignore { .. } => Outcome::Ignore,
            SingleResult::Fail(_) => Outcome::Fail,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.outcome() == Outcome::Pass
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            SingleResult::Fail(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&RunOptions> {
        match self {
            SingleResult::Pass { options } | SingleResult::Ignore { options } => options.as_ref(),
            SingleResult::Fail(_) => None,
        }
    }
}

const IGNORE_STATUS: &str = "IGNORE";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Bool(bool),
    Text(String),
}

impl Serialize for SingleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SingleResult::Pass { options } | SingleResult::Ignore { options } => {
                let len = if options.is_some() { 3 } else { 1 };
                let mut seq = serializer.serialize_seq(Some(len))?;
                if matches!(self, SingleResult::Pass { .. }) {
                    seq.serialize_element(&true)?;
                } else {
                    seq.serialize_element(IGNORE_STATUS)?;
                }
                if let Some(options) = options {
                    seq.serialize_element(&Option::<Failure>::None)?;
                    seq.serialize_element(options)?;
                }
                seq.end()
            }
            SingleResult::Fail(failure) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&false)?;
                seq.serialize_element(failure)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SingleResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultVisitor;

        impl<'de> Visitor<'de> for ResultVisitor {
            type Value = SingleResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array [status, error?, options?]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let status: RawStatus = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let failure = seq.next_element::<Option<Failure>>()?.flatten();
                let options = seq.next_element::<Option<RunOptions>>()?.flatten();
                while seq.next_element::<IgnoredAny>()?.is_some() {}

                match status {
                    RawStatus::Bool(true) => Ok(SingleResult::Pass { options }),
                    RawStatus::Bool(false) => Ok(SingleResult::Fail(failure.unwrap_or(
                        Failure::Unexpected {
                            message: String::new(),
                        },
                    ))),
                    RawStatus::Text(text) if text == IGNORE_STATUS => {
                        Ok(SingleResult::Ignore { options })
                    }
                    RawStatus::Text(text) => Err(de::Error::invalid_value(
                        de::Unexpected::Str(&text),
                        &"true, false or \"IGNORE\"",
                    )),
                }
            }
        }

        deserializer.deserialize_seq(ResultVisitor)
    }
}

/// Header of one platform/day run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReportMetadata {
    pub date: String,
    #[serde(rename = "denoVersion")]
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    #[serde(rename = "nodeVersion")]
    pub target_version: String,
    #[serde(default)]
    pub run_id: Option<String>,
    pub total: u64,
    pub pass: u64,
    /// Absent in reports written before ignore tracking existed.
    #[serde(default)]
    pub ignore: u64,
}

impl TestReportMetadata {
    /// Check `pass <= total` and `ignore <= total`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.pass > self.total || self.ignore > self.total {
            return Err(CoreError::InvalidCounts {
                date: self.date.clone(),
                os: self.os.clone(),
                total: self.total,
                pass: self.pass,
                ignore: self.ignore,
            });
        }
        Ok(())
    }

    /// Header `(pass, total)`, as fed to [`crate::format_percentage`].
    pub fn pass_rate(&self) -> (usize, usize) {
        (self.pass as usize, self.total as usize)
    }
}

/// Full report: header plus per-test results keyed by test name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    #[serde(flatten)]
    pub metadata: TestReportMetadata,
    pub results: BTreeMap<String, SingleResult>,
}

impl TestReport {
    pub fn result(&self, name: &str) -> Option<&SingleResult> {
        self.results.get(name)
    }

    pub fn pass_rate(&self) -> (usize, usize) {
        self.metadata.pass_rate()
    }
}

/// Strip the per-test results from a report.
pub fn extract_metadata(report: &TestReport) -> TestReportMetadata {
    report.metadata.clone()
}

/// The three platforms' reports for one date.
#[derive(Debug, Clone, Default)]
pub struct DayReport {
    pub date: String,
    pub linux: Option<Arc<TestReport>>,
    pub windows: Option<Arc<TestReport>>,
    pub darwin: Option<Arc<TestReport>>,
}

impl DayReport {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<TestReport>> {
        match platform {
            Platform::Linux => self.linux.as_ref(),
            Platform::Windows => self.windows.as_ref(),
            Platform::Darwin => self.darwin.as_ref(),
        }
    }

    pub fn set(&mut self, platform: Platform, report: Option<Arc<TestReport>>) {
        match platform {
            Platform::Linux => self.linux = report,
            Platform::Windows => self.windows = report,
            Platform::Darwin => self.darwin = report,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.linux.is_none() && self.windows.is_none() && self.darwin.is_none()
    }

    /// Test names of the first available report (windows, then linux, then darwin).
    pub fn test_names(&self) -> Vec<&str> {
        self.windows
            .as_ref()
            .or(self.linux.as_ref())
            .or(self.darwin.as_ref())
            .map(|report| report.results.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Metadata-only projection of a [`DayReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<TestReportMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<TestReportMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin: Option<TestReportMetadata>,
}

impl DaySummary {
    pub fn get(&self, platform: Platform) -> Option<&TestReportMetadata> {
        match platform {
            Platform::Linux => self.linux.as_ref(),
            Platform::Windows => self.windows.as_ref(),
            Platform::Darwin => self.darwin.as_ref(),
        }
    }
}

impl From<&DayReport> for DaySummary {
    fn from(day: &DayReport) -> Self {
        Self {
            date: day.date.clone(),
            windows: day.windows.as_deref().map(extract_metadata),
            linux: day.linux.as_deref().map(extract_metadata),
            darwin: day.darwin.as_deref().map(extract_metadata),
        }
    }
}

/// Day summaries of one calendar month, keyed by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    #[serde(default)]
    pub reports: BTreeMap<String, DaySummary>,
    pub month: String,
}

impl MonthSummary {
    pub fn empty(month: impl Into<String>) -> Self {
        Self {
            reports: BTreeMap::new(),
            month: month.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Merge a day in, replacing any previous summary for the same date.
    pub fn insert(&mut self, day: DaySummary) {
        self.reports.insert(day.date.clone(), day);
    }

    pub fn latest_day(&self) -> Option<&DaySummary> {
        self.reports
            .values()
            .filter_map(|day| parse_date(&day.date).ok().map(|date| (date, day)))
            .max_by_key(|(date, _)| *date)
            .map(|(_, day)| day)
    }

    /// Summaries in ascending date order; unparsable dates sort last.
    pub fn days_sorted(&self) -> Vec<&DaySummary> {
        let mut days: Vec<&DaySummary> = self.reports.values().collect();
        days.sort_by_key(|day| (parse_date(&day.date).ok().is_none(), parse_date(&day.date).ok()));
        days
    }
}

/// The day with the latest date in `summary`, if any.
pub fn latest_day_summary(summary: &MonthSummary) -> Option<&DaySummary> {
    summary.latest_day()
}
