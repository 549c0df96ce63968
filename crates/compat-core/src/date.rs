//! Date and month keys (`YYYY-MM-DD`, `YYYY-MM`).

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::error::{CoreError, CoreResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MONTH_FORMAT: &str = "%Y-%m";

/// Parse a `YYYY-MM-DD` date key.
pub fn parse_date(value: &str) -> CoreResult<NaiveDate> {
    // chrono accepts single-digit fields; keys are always zero-padded
    if value.len() != 10 {
        return Err(CoreError::InvalidDate {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| CoreError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse a `YYYY-MM` month key into the first day of that month.
pub fn parse_month(value: &str) -> CoreResult<NaiveDate> {
    if value.len() != 7 {
        return Err(CoreError::InvalidMonth {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(&format!("{value}-01"), DATE_FORMAT).map_err(|_| {
        CoreError::InvalidMonth {
            value: value.to_string(),
        }
    })
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn month_key(date: NaiveDate) -> String {
    date.format(MONTH_FORMAT).to_string()
}

/// Month key `offset` months before the month of `today`.
///
/// The shift is computed from the 15th so that month lengths never push the
/// result into a neighbouring month.
pub fn month_offset(today: NaiveDate, offset: u32) -> String {
    let anchor = today.with_day(15).unwrap_or(today);
    let shifted = anchor.checked_sub_months(Months::new(offset)).unwrap_or(anchor);
    month_key(shifted)
}

/// Date key `n` days before `today`.
pub fn days_ago(today: NaiveDate, n: u64) -> String {
    date_key(today.checked_sub_days(Days::new(n)).unwrap_or(today))
}

/// All date keys of a month in ascending order.
pub fn dates_in_month(month: &str) -> CoreResult<Vec<String>> {
    let first = parse_month(month)?;
    let mut dates = Vec::with_capacity(31);
    let mut day = first;
    while day.month() == first.month() {
        dates.push(date_key(day));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    Ok(dates)
}
