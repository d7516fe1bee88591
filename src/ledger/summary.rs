//! Period summaries over ledger rows

use super::{RowField, SheetRow};
use crate::catalog::{TransactionType, REIMBURSIBLES_CATEGORY};
use crate::validation::parse_amount;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Reads the `date` column of stored rows.
///
/// Tries the timestamp layout new rows are written with, then a few common
/// layouts, then falls back to the leading `MM/DD/YYYY` token.
#[derive(Debug, Clone)]
pub struct RowDateParser {
    timestamp_format: String,
}

impl RowDateParser {
    const EXTRA_DATETIME_FORMATS: [&'static str; 3] =
        ["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y, %H:%M:%S"];
    const EXTRA_DATE_FORMATS: [&'static str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        std::iter::once(self.timestamp_format.as_str())
            .chain(Self::EXTRA_DATETIME_FORMATS)
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|dt| dt.date())
            .or_else(|| {
                Self::EXTRA_DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            })
            .or_else(|| Self::parse_leading_mdy(text))
    }

    fn parse_leading_mdy(text: &str) -> Option<NaiveDate> {
        let first = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .find(|s| !s.is_empty())?;
        let mut parts = first.split('/');
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        let year = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Data rows of `rows` (header at index 0) dated within `[start, end]`.
///
/// Rows with fewer than seven cells or an unreadable date are skipped. The
/// type is not checked here: every dated row counts as a transaction.
pub fn filter_by_range(
    rows: &[SheetRow],
    start: NaiveDate,
    end: NaiveDate,
    parser: &RowDateParser,
) -> Vec<SheetRow> {
    let kept: Vec<SheetRow> = rows
        .iter()
        .skip(1)
        .filter(|row| row.len() >= RowField::ALL.len())
        .filter(|row| {
            let date = &row[RowField::Date.index()];
            match parser.parse(date) {
                Some(day) => day >= start && day <= end,
                None => {
                    tracing::warn!(date = %date, "Could not parse row date");
                    false
                }
            }
        })
        .cloned()
        .collect();

    tracing::debug!(
        start = %start,
        end = %end,
        kept = kept.len(),
        "Filtered rows by date range"
    );
    kept
}

/// Income and spend totals for a period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_income: Decimal,
    pub income_by_category: BTreeMap<String, Decimal>,
    pub expense_by_category: BTreeMap<String, Decimal>,
    pub transaction_count: usize,
}

/// Sum absolute amounts into income and expense totals.
///
/// Every row counts as a transaction. Only income and expense rows reach the
/// totals, and expenses filed under the reimbursement-pending category are
/// left out: that money is expected back.
pub fn aggregate(rows: &[SheetRow]) -> Summary {
    let mut summary = Summary {
        transaction_count: rows.len(),
        ..Summary::default()
    };

    for row in rows {
        let cell = |f: RowField| row.get(f.index()).map_or("", String::as_str);
        let category = cell(RowField::Category);
        let amount = parse_amount(cell(RowField::Amount)).abs();

        match cell(RowField::Type).parse::<TransactionType>() {
            Ok(TransactionType::Income) => {
                summary.total_income += amount;
                *summary
                    .income_by_category
                    .entry(category.to_string())
                    .or_default() += amount;
            }
            Ok(TransactionType::Expense) if category != REIMBURSIBLES_CATEGORY => {
                summary.total_expense += amount;
                *summary
                    .expense_by_category
                    .entry(category.to_string())
                    .or_default() += amount;
            }
            Ok(_) => {}
            Err(()) => {
                tracing::debug!(tx_type = %cell(RowField::Type), "Row with unknown type left out of totals");
            }
        }
    }

    summary.net_income = summary.total_income - summary.total_expense;
    summary
}
