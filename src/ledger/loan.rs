//! Loan draw-down and amortization schedule rows

use super::{LedgerRow, RowField, SheetRow};
use crate::catalog::{TransactionType, INTEREST_EXPENSE_CATEGORY, LOAN_CLEARING_ACCOUNT};
use crate::format::format_date;
use crate::validation::resolve_strict_date;
use chrono::Months;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_DISBURSEMENT_ACCOUNT: &str = "Maribank";

const PROCEEDS_TRANSFER_DESCRIPTION: &str = "Loan proceeds transfer only";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("First billing date is not a valid MM/DD/YYYY date: {0}")]
    InvalidBillingDate(String),
    #[error("Payment #{0} falls outside the supported calendar")]
    DateOutOfRange(u32),
}

/// What the user entered in the payable flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTerms {
    /// Account the monthly payments come out of
    pub account: String,
    pub description: String,
    pub proceeds: Decimal,
    /// First billing date exactly as typed, `MM/DD/YYYY`
    pub first_billing: String,
    pub term_count: u32,
    pub monthly_principal: Decimal,
    pub monthly_interest: Decimal,
    pub processing_fee: Decimal,
}

impl LoanTerms {
    fn tag(&self, loan_number: u32) -> String {
        format!("{} Loan #{loan_number}", self.account)
    }
}

/// Build every row of a new loan, in append order.
///
/// Two bookkeeping rows dated `now` (draw-down into the clearing account,
/// then the transfer out to `disbursement_account`), a principal and an
/// interest expense per month starting at the first billing date, and a
/// processing fee row when the fee is positive.
pub fn generate_schedule(
    terms: &LoanTerms,
    loan_number: u32,
    disbursement_account: &str,
    now: &str,
) -> Result<Vec<LedgerRow>, ScheduleError> {
    let first = resolve_strict_date(&terms.first_billing)
        .ok_or_else(|| ScheduleError::InvalidBillingDate(terms.first_billing.clone()))?;
    let tag = terms.tag(loan_number);
    let has_fee = terms.processing_fee > Decimal::ZERO;

    let mut rows = Vec::with_capacity(2 + 2 * terms.term_count as usize + usize::from(has_fee));
    rows.push(LedgerRow::new(
        now,
        TransactionType::Loan,
        "",
        "",
        LOAN_CLEARING_ACCOUNT,
        terms.description.clone(),
        terms.proceeds,
    ));
    rows.push(LedgerRow::new(
        now,
        TransactionType::Transfer,
        "",
        LOAN_CLEARING_ACCOUNT,
        disbursement_account,
        PROCEEDS_TRANSFER_DESCRIPTION,
        terms.proceeds,
    ));

    for i in 0..terms.term_count {
        let date = first
            .checked_add_months(Months::new(i))
            .ok_or(ScheduleError::DateOutOfRange(i + 1))?;
        let date = format_date(date);

        rows.push(LedgerRow::new(
            date.clone(),
            TransactionType::Expense,
            "",
            terms.account.clone(),
            "",
            format!("{tag} - Principal #{}", i + 1),
            -terms.monthly_principal,
        ));
        rows.push(LedgerRow::new(
            date,
            TransactionType::Expense,
            INTEREST_EXPENSE_CATEGORY,
            terms.account.clone(),
            "",
            format!("{tag} - Interest #{}", i + 1),
            -terms.monthly_interest,
        ));
    }

    if has_fee {
        rows.push(LedgerRow::new(
            terms.first_billing.clone(),
            TransactionType::Expense,
            INTEREST_EXPENSE_CATEGORY,
            terms.account.clone(),
            "",
            format!("{tag} - Processing fee"),
            -terms.processing_fee,
        ));
    }

    Ok(rows)
}

/// Per-account first loan number, for accounts whose numbering predates the
/// ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanOffsets(HashMap<String, u32>);

impl Default for LoanOffsets {
    fn default() -> Self {
        Self::parse("BPI - Platinum MC=2;Eastwest - Gold MC=5")
    }
}

impl LoanOffsets {
    /// Parse `Account=N;Other=M`. Malformed entries are skipped.
    pub fn parse(text: &str) -> Self {
        let map = text
            .split(';')
            .filter_map(|entry| {
                let (account, start) = entry.rsplit_once('=')?;
                let start = start.trim().parse::<u32>().ok()?;
                let account = account.trim();
                (!account.is_empty()).then(|| (account.to_string(), start))
            })
            .collect();
        Self(map)
    }

    pub fn start_for(&self, account: &str) -> u32 {
        self.0.get(account).copied().unwrap_or(1)
    }
}

fn loan_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Loan #(\d+)").expect("valid regex"))
}

/// Next loan number for `account`: one past the highest `<account> Loan #k`
/// already recorded against it, and never below the configured start.
///
/// Not transactional on its own; callers serialize per account.
pub fn next_loan_number(rows: &[SheetRow], account: &str, offsets: &LoanOffsets) -> u32 {
    let marker = format!("{account} Loan #");
    let floor = offsets.start_for(account).saturating_sub(1);

    rows.iter()
        .skip(1)
        .filter(|row| row.len() > RowField::Description.index())
        .filter(|row| row[RowField::Account1.index()] == account)
        .filter_map(|row| {
            let description = &row[RowField::Description.index()];
            if !description.contains(&marker) {
                return None;
            }
            loan_number_re()
                .captures(description)?
                .get(1)?
                .as_str()
                .parse::<u32>()
                .ok()
        })
        .fold(floor, u32::max)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn terms(term_count: u32, fee: Decimal) -> LoanTerms {
        LoanTerms {
            account: "BPI - Platinum MC".to_string(),
            description: "Laptop".to_string(),
            proceeds: dec!(60000),
            first_billing: "01/31/2025".to_string(),
            term_count,
            monthly_principal: dec!(5000),
            monthly_interest: dec!(250),
            processing_fee: fee,
        }
    }

    fn row(account1: &str, description: &str) -> SheetRow {
        ["01/01/2025", "Expense", "", account1, "", description, "-1"]
            .map(String::from)
            .to_vec()
    }

    fn header() -> SheetRow {
        vec!["Date".to_string(); 7]
    }

    #[test]
    fn bookkeeping_rows_lead_the_schedule() {
        let rows = generate_schedule(&terms(2, Decimal::ZERO), 3, "Maribank", "now").unwrap();

        assert_eq!(rows[0].tx_type, TransactionType::Loan);
        assert_eq!(rows[0].account1, "");
        assert_eq!(rows[0].account2, LOAN_CLEARING_ACCOUNT);
        assert_eq!(rows[0].description, "Laptop");
        assert_eq!(rows[0].amount, dec!(60000));
        assert_eq!(rows[0].date, "now");

        assert_eq!(rows[1].tx_type, TransactionType::Transfer);
        assert_eq!(rows[1].account1, LOAN_CLEARING_ACCOUNT);
        assert_eq!(rows[1].account2, "Maribank");
        assert_eq!(rows[1].description, PROCEEDS_TRANSFER_DESCRIPTION);
        assert_eq!(rows[1].amount, dec!(60000));
    }

    #[test]
    fn periods_pair_principal_and_interest() {
        let rows = generate_schedule(&terms(3, Decimal::ZERO), 3, "Maribank", "now").unwrap();
        let period: Vec<_> = rows[2..].iter().collect();

        assert_eq!(period[0].description, "BPI - Platinum MC Loan #3 - Principal #1");
        assert_eq!(period[0].category, "");
        assert_eq!(period[0].amount, dec!(-5000));
        assert_eq!(period[1].description, "BPI - Platinum MC Loan #3 - Interest #1");
        assert_eq!(period[1].category, INTEREST_EXPENSE_CATEGORY);
        assert_eq!(period[1].amount, dec!(-250));
        assert_eq!(period[5].description, "BPI - Platinum MC Loan #3 - Interest #3");
        assert!(period.iter().all(|r| r.account1 == "BPI - Platinum MC"));
    }

    #[test]
    fn month_ends_are_clamped() {
        let rows = generate_schedule(&terms(3, Decimal::ZERO), 1, "Maribank", "now").unwrap();
        let dates: Vec<_> = rows[2..].iter().step_by(2).map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["01/31/2025", "02/28/2025", "03/31/2025"]);
    }

    #[test]
    fn fee_row_uses_the_typed_billing_date() {
        let rows = generate_schedule(&terms(2, dec!(1500)), 4, "Maribank", "now").unwrap();
        let fee = rows.last().unwrap();
        assert_eq!(fee.date, "01/31/2025");
        assert_eq!(fee.description, "BPI - Platinum MC Loan #4 - Processing fee");
        assert_eq!(fee.category, INTEREST_EXPENSE_CATEGORY);
        assert_eq!(fee.amount, dec!(-1500));
    }

    #[test]
    fn billing_date_must_be_strict() {
        let mut t = terms(1, Decimal::ZERO);
        t.first_billing = "1/31/2025".to_string();
        assert_eq!(
            generate_schedule(&t, 1, "Maribank", "now"),
            Err(ScheduleError::InvalidBillingDate("1/31/2025".to_string()))
        );
    }

    #[test]
    fn numbering_continues_after_highest_match() {
        let rows = vec![
            header(),
            row("AccountX", "AccountX Loan #3 - Principal #1"),
            row("AccountX", "AccountX Loan #7 - Interest #2"),
            row("AccountY", "AccountY Loan #20 - Principal #1"),
            row("AccountY", "AccountX Loan #30 - Principal #1"),
            row("AccountX", "groceries"),
        ];
        assert_eq!(next_loan_number(&rows, "AccountX", &LoanOffsets::parse("")), 8);
    }

    #[test]
    fn offsets_set_the_floor() {
        let offsets = LoanOffsets::default();
        assert_eq!(offsets.start_for("BPI - Platinum MC"), 2);
        assert_eq!(offsets.start_for("Eastwest - Gold MC"), 5);
        assert_eq!(offsets.start_for("Cash"), 1);

        assert_eq!(next_loan_number(&[header()], "Eastwest - Gold MC", &offsets), 5);
        let rows = vec![header(), row("Eastwest - Gold MC", "Eastwest - Gold MC Loan #9 - Principal #1")];
        assert_eq!(next_loan_number(&rows, "Eastwest - Gold MC", &offsets), 10);
        assert_eq!(next_loan_number(&[], "Cash", &offsets), 1);
    }

    #[test]
    fn short_rows_and_header_are_ignored() {
        let rows = vec![
            row("AccountX", "AccountX Loan #4 - Principal #1"),
            vec!["d".to_string(), "Expense".to_string(), String::new(), "AccountX".to_string()],
        ];
        assert_eq!(next_loan_number(&rows, "AccountX", &LoanOffsets::parse("")), 1);
    }

    #[test]
    fn malformed_offsets_are_skipped() {
        let offsets = LoanOffsets::parse("A=3; =4;B=x;C - Card = 6");
        assert_eq!(offsets.start_for("A"), 3);
        assert_eq!(offsets.start_for("B"), 1);
        assert_eq!(offsets.start_for("C - Card"), 6);
    }

    proptest! {
        #[test]
        fn schedule_length(term_count in 1u32..=360, fee_cents in 0i64..100_000) {
            let fee = Decimal::new(fee_cents, 2);
            let rows = generate_schedule(&terms(term_count, fee), 1, "Maribank", "now").unwrap();
            let expected = 2 + 2 * term_count as usize + usize::from(fee > Decimal::ZERO);
            prop_assert_eq!(rows.len(), expected);
        }
    }
}
