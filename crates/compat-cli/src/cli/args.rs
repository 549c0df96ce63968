use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "compat",
    version,
    about = "Browse daily node compat test reports: pass rates, categories, errors and flaky tests"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Base URL of the report bucket
    #[arg(long, global = true, env = "COMPAT_REPORTS_URL")]
    pub base_url: Option<String>,

    /// Max report fetches in flight
    #[arg(long, global = true, env = "COMPAT_FETCH_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the header and pass rate of one platform's report
    Report(ReportArgs),
    /// Histogram of failure messages in one platform's report
    Errors(ErrorsArgs),
    /// Per-category pass rates of a day on every platform
    Categories(CategoriesArgs),
    /// Day-by-day totals of the latest months
    Summary(SummaryArgs),
    /// Passing, failing, ignored and flaky tests over recent days
    Consistency(ConsistencyArgs),
    /// Consistently passing tests as a TOML `[tests]` table
    PassingToml(PassingTomlArgs),
    /// Rebuild a month summary file from daily reports
    BuildSummary(BuildSummaryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Date as YYYY-MM-DD, or "latest"
    pub date: String,

    /// linux, windows or darwin
    pub os: String,

    /// Print the raw report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ErrorsArgs {
    /// Date as YYYY-MM-DD, or "latest"
    pub date: String,

    /// linux, windows or darwin
    pub os: String,

    /// Only print the N most frequent messages
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CategoriesArgs {
    /// Date as YYYY-MM-DD, or "latest"
    pub date: String,

    /// Count every test of a category in the denominator, not only decided ones
    #[arg(long)]
    pub all_named: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Number of non-empty months to show
    #[arg(long, default_value_t = 1)]
    pub months: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ConsistencyArgs {
    /// Number of days before today to sample
    #[arg(long, default_value_t = 10)]
    pub days: u64,
}

#[derive(Args, Debug, Clone)]
pub struct PassingTomlArgs {
    /// Number of days before today to sample
    #[arg(long, default_value_t = 10)]
    pub days: u64,

    /// Additional test name to leave out (repeatable)
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Keep the built-in exclusions out of the filter
    #[arg(long)]
    pub no_default_excludes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BuildSummaryArgs {
    /// Month as YYYY-MM
    pub month: String,

    /// Dates to recompute and merge (YYYY-MM-DD). Defaults to every day of
    /// the month up to today
    pub dates: Vec<String>,

    /// Output file for the gzip-compressed summary
    #[arg(long)]
    pub out: PathBuf,
}
