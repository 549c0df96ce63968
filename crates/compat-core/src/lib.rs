//! Core of the compat report viewer.
//!
//! - [`model`]: test reports, day reports and month summaries
//! - [`category`]: mapping of test names to functional categories
//! - [`stats`]: subset pass rates, consistency classification, error histograms
//! - [`date`]: date and month keys

pub mod category;
pub mod date;
pub mod error;
pub mod model;
pub mod stats;

pub use category::{classify, split_by_category, Category};
pub use error::{CoreError, CoreResult};
pub use model::{
    extract_metadata, latest_day_summary, DayReport, DaySummary, Failure, MonthSummary, Outcome,
    Platform, RunOptions, SingleResult, TestReport, TestReportMetadata,
};
pub use stats::{
    category_breakdown, consistency_classify, consistency_classify_filtered, error_histogram,
    format_percentage, rate_for_subset, rate_for_subset_with, CategoryRow, ConsistencyFilter,
    ConsistencyReport, DenominatorPolicy, SubsetRate,
};
