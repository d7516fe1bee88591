//! Presentation helpers: money, timestamps and reply-safe text

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};

/// Date layout used for schedule rows and report ranges
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Locale-dependent rendering settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub timezone: Tz,
    pub currency_symbol: String,
    /// chrono format string for the `date` column of new rows
    pub timestamp_format: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Manila,
            currency_symbol: "₱".to_string(),
            timestamp_format: "%m/%d/%Y, %I:%M:%S %p".to_string(),
        }
    }
}

impl Locale {
    /// Absolute value with two decimals and grouped thousands (`₱1,234.50`)
    pub fn currency(&self, amount: Decimal) -> String {
        let rounded = amount
            .abs()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{rounded:.2}");
        let (whole, frac) = text.split_once('.').unwrap_or((&text, "00"));
        format!("{}{}.{}", self.currency_symbol, group_thousands(whole), frac)
    }

    /// Timestamp written into the `date` column of a new row
    pub fn timestamp(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone)
            .format(&self.timestamp_format)
            .to_string()
    }

    /// Calendar day of `now` in the configured timezone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Insert `,` every three digits of an unsigned integer string
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
