//! Input parsing for the conversation steps
//!
//! Everything here is pure. Parsers mirror what a spreadsheet user types:
//! thousands separators, currency symbols and trailing words are tolerated.

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

/// Longest accepted loan term, in months
pub const MAX_LOAN_TERMS: u32 = 360;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Prefix carried by the year and month buttons
pub const CALENDAR_BUTTON_PREFIX: &str = "📅 ";

fn strict_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(0[1-9]|1[0-2])/(0[1-9]|[12][0-9]|3[01])/\d{4}$").expect("strict date regex")
    })
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)").expect("leading number regex"))
}

/// Parse a user-typed or sheet-formatted amount.
///
/// Thousands separators and every character other than digits, `.` and `-`
/// are dropped, then the longest numeric prefix is read. Anything unparsable
/// yields zero, which the amount steps treat as invalid.
pub fn parse_amount(text: &str) -> Decimal {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let Some(m) = leading_number_re().find(&cleaned) else {
        return Decimal::ZERO;
    };
    let number = m.as_str().trim_end_matches('.');
    Decimal::from_str(number)
        .map(|d| if d.is_zero() { Decimal::ZERO } else { d })
        .unwrap_or(Decimal::ZERO)
}

/// Parse the leading integer of `text` (`"12 months"` reads as 12)
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Loan term count in months, `1..=MAX_LOAN_TERMS`
pub fn parse_terms(text: &str) -> Option<u32> {
    parse_leading_int(text)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| (1..=MAX_LOAN_TERMS).contains(n))
}

/// Strict `MM/DD/YYYY` shape check.
///
/// Only the shape is checked: `02/30/2024` passes even though no such day
/// exists.
pub fn is_strict_date(text: &str) -> bool {
    strict_date_re().is_match(text)
}

/// Resolve a strict `MM/DD/YYYY` text to a calendar date.
///
/// Days past the end of the month roll into the next month, so `02/30/2024`
/// becomes 2024-03-01.
pub fn resolve_strict_date(text: &str) -> Option<NaiveDate> {
    if !is_strict_date(text) {
        return None;
    }
    let mut parts = text.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u64 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(day - 1))
}

/// Month number (1-12) from a `📅 <Month>` button
pub fn parse_month_button(text: &str) -> Option<u32> {
    let name = text.strip_prefix(CALENDAR_BUTTON_PREFIX).unwrap_or(text);
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Year from a `📅 <Year>` button
pub fn parse_year_button(text: &str) -> Option<i32> {
    let year = text.strip_prefix(CALENDAR_BUTTON_PREFIX)?;
    year.trim().parse::<i32>().ok().filter(|y| *y > 0)
}

/// The years offered by the summary flow: current year and the two before it
pub fn selectable_years(today: NaiveDate) -> [i32; 3] {
    let year = today.year();
    [year, year - 1, year - 2]
}

/// Inclusive first and last day of a month
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

/// Inclusive first and last day of a year
pub fn year_range(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}
