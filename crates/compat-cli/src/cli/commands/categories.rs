//! CLI command: compat categories
//!
//! Pass rate of every test category on each platform for one day.

use anyhow::Result;
use compat_core::{category_breakdown, CategoryRow, DenominatorPolicy, Platform};
use compat_store::{CancellationToken, ReportStore};
use std::fmt::Write;

use super::super::args::CategoriesArgs;
use crate::exit_codes;

pub async fn run(
    store: &ReportStore,
    args: CategoriesArgs,
    token: &CancellationToken,
) -> Result<i32> {
    let Some(date) = super::resolve(store, &args.date, token).await? else {
        return Ok(exit_codes::NOT_FOUND);
    };
    let day = store.get_report_for_date_with_cancel(&date, token).await;
    if day.is_empty() {
        eprintln!("no reports for {date}");
        return Ok(exit_codes::NOT_FOUND);
    }

    let policy = if args.all_named {
        DenominatorPolicy::NamedSubset
    } else {
        DenominatorPolicy::Decided
    };
    println!("{date}");
    print!("{}", render(&category_breakdown(&day, policy)));
    Ok(exit_codes::SUCCESS)
}

pub fn render(rows: &[CategoryRow]) -> String {
    let width = rows
        .iter()
        .map(|row| row.category.as_str().len())
        .max()
        .unwrap_or(0)
        .max("category".len());

    let mut out = String::new();
    let _ = write!(out, "{:<width$}  {:>6}", "category", "tests");
    for platform in Platform::ALL {
        let _ = write!(out, "  {:>8}", platform.as_str());
    }
    out.push('\n');

    for row in rows {
        let _ = write!(out, "{:<width$}  {:>6}", row.category.as_str(), row.tests);
        for platform in Platform::ALL {
            let cell = row
                .get(platform)
                .map_or_else(|| "-".to_string(), |rate| rate.percentage_label());
            let _ = write!(out, "  {cell:>8}");
        }
        out.push('\n');
    }
    out
}
