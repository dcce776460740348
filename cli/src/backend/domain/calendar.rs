//! Calendar service for dual Gregorian (AD) / Bikram Sambat (BS) dates.
//!
//! Transactions are stored with Gregorian dates; everything the user sees can
//! be displayed, filtered and bucketed in either calendar. BS conversion is
//! table-driven: each supported BS year carries its twelve month lengths, and
//! dates are resolved by day-counting from a fixed anchor (1 Baisakh 2075 =
//! 2018-04-14 AD). Dates outside the table are an error, never a panic.

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, NaiveDate};
use shared::CalendarSystem;

/// First BS year covered by the month-length table.
const BS_TABLE_FIRST_YEAR: i32 = 2075;

/// Gregorian date of 1 Baisakh of [`BS_TABLE_FIRST_YEAR`].
fn bs_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 4, 14).expect("valid anchor date")
}

/// Days in each month (Baisakh..Chaitra) for BS 2075..=2095.
const BS_MONTH_DAYS: &[[u8; 12]] = &[
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2075
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 30, 29, 30], // 2076
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 31], // 2077
    [31, 31, 31, 32, 31, 31, 30, 29, 30, 29, 30, 30], // 2078
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 29, 30, 30], // 2079
    [31, 32, 31, 32, 31, 30, 30, 30, 29, 29, 30, 30], // 2080
    [31, 31, 32, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2081
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2082
    [31, 31, 32, 31, 31, 30, 30, 30, 29, 30, 30, 30], // 2083
    [31, 31, 32, 31, 31, 30, 30, 30, 29, 30, 30, 30], // 2084
    [31, 32, 31, 32, 30, 31, 30, 30, 29, 30, 30, 30], // 2085
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2086
    [31, 31, 32, 31, 31, 31, 30, 30, 29, 30, 30, 30], // 2087
    [30, 31, 32, 32, 30, 31, 30, 30, 29, 30, 30, 30], // 2088
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2089
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2090
    [31, 31, 32, 31, 31, 31, 30, 30, 29, 30, 30, 30], // 2091
    [30, 31, 32, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2092
    [30, 32, 31, 32, 31, 30, 30, 30, 29, 30, 30, 30], // 2093
    [31, 31, 32, 31, 31, 30, 30, 30, 29, 30, 30, 30], // 2094
    [31, 31, 32, 31, 31, 31, 30, 29, 30, 30, 30, 30], // 2095
];

const AD_MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const BS_MONTH_NAMES: [&str; 12] = [
    "Baisakh", "Jestha", "Asar", "Shrawan", "Bhadra", "Ashwin", "Kartik", "Mangsir", "Poush",
    "Magh", "Falgun", "Chaitra",
];

/// A date in the Bikram Sambat calendar. Month and day are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BsDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

fn month_days(year: i32) -> Result<&'static [u8; 12]> {
    let index = year - BS_TABLE_FIRST_YEAR;
    if index < 0 || index as usize >= BS_MONTH_DAYS.len() {
        bail!(
            "BS year {} is outside the supported range {}..={}",
            year,
            BS_TABLE_FIRST_YEAR,
            BS_TABLE_FIRST_YEAR + BS_MONTH_DAYS.len() as i32 - 1
        );
    }
    Ok(&BS_MONTH_DAYS[index as usize])
}

/// Number of days in the given BS month (1-based).
pub fn days_in_bs_month(year: i32, month: u32) -> Result<u32> {
    if !(1..=12).contains(&month) {
        bail!("BS month {month} is out of range 1..=12");
    }
    Ok(month_days(year)?[(month - 1) as usize] as u32)
}

/// Convert a Gregorian date to Bikram Sambat.
pub fn to_bs(date: NaiveDate) -> Result<BsDate> {
    let mut remaining = (date - bs_anchor()).num_days();
    if remaining < 0 {
        bail!(
            "date {} predates the supported BS range (before {})",
            date,
            bs_anchor()
        );
    }

    for (offset, months) in BS_MONTH_DAYS.iter().enumerate() {
        let year_days: i64 = months.iter().map(|d| *d as i64).sum();
        if remaining >= year_days {
            remaining -= year_days;
            continue;
        }
        for (month_index, days) in months.iter().enumerate() {
            let days = *days as i64;
            if remaining < days {
                return Ok(BsDate {
                    year: BS_TABLE_FIRST_YEAR + offset as i32,
                    month: month_index as u32 + 1,
                    day: remaining as u32 + 1,
                });
            }
            remaining -= days;
        }
    }
    bail!(
        "date {} is beyond the supported BS range (table ends at BS {})",
        date,
        BS_TABLE_FIRST_YEAR + BS_MONTH_DAYS.len() as i32 - 1
    )
}

/// Convert a Bikram Sambat date to Gregorian.
pub fn from_bs(bs: BsDate) -> Result<NaiveDate> {
    let months = month_days(bs.year)?;
    if !(1..=12).contains(&bs.month) {
        bail!("BS month {} is out of range 1..=12", bs.month);
    }
    let month_len = months[(bs.month - 1) as usize] as u32;
    if bs.day < 1 || bs.day > month_len {
        bail!(
            "BS {}-{:02} has {} days, got day {}",
            bs.year,
            bs.month,
            month_len,
            bs.day
        );
    }

    let mut days: i64 = 0;
    for offset in 0..(bs.year - BS_TABLE_FIRST_YEAR) as usize {
        days += BS_MONTH_DAYS[offset].iter().map(|d| *d as i64).sum::<i64>();
    }
    for month_index in 0..(bs.month - 1) as usize {
        days += months[month_index] as i64;
    }
    days += bs.day as i64 - 1;
    Ok(bs_anchor() + Duration::days(days))
}

/// The (year, month) a date falls in under the given calendar. Month is
/// 1-based in both systems. This is the bucketing used consistently for
/// filtering, grouping and labels.
pub fn year_month(date: NaiveDate, calendar: CalendarSystem) -> Result<(i32, u32)> {
    match calendar {
        CalendarSystem::Ad => Ok((date.year(), date.month())),
        CalendarSystem::Bs => {
            let bs = to_bs(date)?;
            Ok((bs.year, bs.month))
        }
    }
}

/// `YYYY-MM-DD` in the selected calendar.
pub fn format_date(date: NaiveDate, calendar: CalendarSystem) -> Result<String> {
    match calendar {
        CalendarSystem::Ad => Ok(date.format("%Y-%m-%d").to_string()),
        CalendarSystem::Bs => {
            let bs = to_bs(date)?;
            Ok(format!("{}-{:02}-{:02}", bs.year, bs.month, bs.day))
        }
    }
}

/// Month name (1-based) in the selected calendar.
pub fn month_name(month: u32, calendar: CalendarSystem) -> &'static str {
    let names = month_names(calendar);
    names
        .get((month.saturating_sub(1)) as usize)
        .copied()
        .unwrap_or("?")
}

/// All twelve month names for the selected calendar.
pub fn month_names(calendar: CalendarSystem) -> [&'static str; 12] {
    match calendar {
        CalendarSystem::Ad => AD_MONTH_NAMES,
        CalendarSystem::Bs => BS_MONTH_NAMES,
    }
}
