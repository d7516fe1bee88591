//! Reply keyboards and the button labels the state machine matches on

use crate::catalog::{Catalog, CategoryFamily, TransactionType};
use crate::validation::{CALENDAR_BUTTON_PREFIX, MONTH_NAMES};
use serde::Serialize;

pub const BTN_CANCEL: &str = "❌ Cancel";
pub const BTN_BACK: &str = "🔙 Back";
pub const BTN_BACK_TO_MENU: &str = "🔙 Back to Menu";

pub const BTN_ADD_EXPENSE: &str = "💸 Add Expense";
pub const BTN_ADD_INCOME: &str = "💰 Add Income";
pub const BTN_ADD_TRANSFER: &str = "🔄 Add Transfer";
pub const BTN_ADD_REIMBURSEMENT: &str = "💳 Add Reimbursement";
pub const BTN_ADD_RECEIVABLE: &str = "🤝 Add Receivable";
pub const BTN_ADD_PAYABLE: &str = "💵 Add Payable";
pub const BTN_VIEW_RECENT: &str = "📊 View Recent";
pub const BTN_SUMMARY: &str = "📈 Financial Summary";
pub const BTN_DELETE: &str = "🗑️ Delete Transaction";
pub const BTN_EDIT: &str = "📝 Edit Transaction";

pub const BTN_NEW_RECEIVABLE: &str = "➕ New Receivable";
pub const BTN_PAYMENT_RECEIVED: &str = "💰 Payment Received";

pub const BTN_MONTHLY_SUMMARY: &str = "📅 Monthly Summary";
pub const BTN_YEARLY_SUMMARY: &str = "📆 Yearly Summary";

pub const BTN_EDIT_DATE: &str = "📅 Edit Date";
pub const BTN_EDIT_TYPE: &str = "📊 Edit Type";
pub const BTN_EDIT_CATEGORY: &str = "📁 Edit Category";
pub const BTN_EDIT_ACCOUNT1: &str = "💳 Edit Account 1";
pub const BTN_EDIT_ACCOUNT2: &str = "💳 Edit Account 2";
pub const BTN_EDIT_DESCRIPTION: &str = "📝 Edit Description";
pub const BTN_EDIT_AMOUNT: &str = "💰 Edit Amount";

/// A reply keyboard as rows of button labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
    /// Hide the keyboard after one press
    pub one_time: bool,
}

impl Keyboard {
    fn new<R, B>(rows: R, one_time: bool) -> Self
    where
        R: IntoIterator<Item = Vec<B>>,
        B: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
            one_time,
        }
    }

    /// Two buttons per row followed by a back row
    fn paired(labels: &[String], back: &str) -> Self {
        let mut rows: Vec<Vec<String>> = labels.chunks(2).map(<[String]>::to_vec).collect();
        rows.push(vec![back.to_string()]);
        Self { rows, one_time: true }
    }

    /// No keyboard at all; the client keeps whatever it showed last
    pub fn none() -> Self {
        Self {
            rows: vec![],
            one_time: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every label on the keyboard, in order
    #[cfg(test)]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

pub fn main_menu() -> Keyboard {
    Keyboard::new(
        [
            vec![BTN_ADD_EXPENSE, BTN_ADD_INCOME],
            vec![BTN_ADD_TRANSFER, BTN_ADD_REIMBURSEMENT],
            vec![BTN_ADD_RECEIVABLE, BTN_ADD_PAYABLE],
            vec![BTN_VIEW_RECENT, BTN_SUMMARY],
            vec![BTN_DELETE, BTN_EDIT],
            vec![BTN_CANCEL],
        ],
        false,
    )
}

/// Free-text steps only offer a way back
pub fn back_only() -> Keyboard {
    Keyboard::new([vec![BTN_BACK]], false)
}

pub fn back_to_menu_only() -> Keyboard {
    Keyboard::new([vec![BTN_BACK_TO_MENU]], false)
}

pub fn categories(catalog: &Catalog, family: CategoryFamily) -> Keyboard {
    Keyboard::paired(catalog.categories(family), BTN_BACK)
}

pub fn accounts(catalog: &Catalog) -> Keyboard {
    Keyboard::paired(&catalog.accounts, BTN_BACK)
}

pub fn receivable_kind() -> Keyboard {
    Keyboard::new(
        [
            vec![BTN_NEW_RECEIVABLE],
            vec![BTN_PAYMENT_RECEIVED],
            vec![BTN_BACK],
        ],
        true,
    )
}

pub fn summary_kind() -> Keyboard {
    Keyboard::new(
        [
            vec![BTN_MONTHLY_SUMMARY],
            vec![BTN_YEARLY_SUMMARY],
            vec![BTN_BACK_TO_MENU],
        ],
        true,
    )
}

pub fn years(years: &[i32]) -> Keyboard {
    let mut rows: Vec<Vec<String>> = years
        .iter()
        .map(|y| vec![format!("{CALENDAR_BUTTON_PREFIX}{y}")])
        .collect();
    rows.push(vec![BTN_BACK.to_string()]);
    Keyboard { rows, one_time: true }
}

pub fn months() -> Keyboard {
    let mut rows: Vec<Vec<String>> = MONTH_NAMES
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|m| format!("{CALENDAR_BUTTON_PREFIX}{m}"))
                .collect()
        })
        .collect();
    rows.push(vec![BTN_BACK.to_string()]);
    Keyboard { rows, one_time: true }
}

pub fn edit_fields() -> Keyboard {
    Keyboard::new(
        [
            vec![BTN_EDIT_DATE, BTN_EDIT_TYPE],
            vec![BTN_EDIT_CATEGORY, BTN_EDIT_ACCOUNT1],
            vec![BTN_EDIT_ACCOUNT2, BTN_EDIT_DESCRIPTION],
            vec![BTN_EDIT_AMOUNT],
            vec![BTN_BACK_TO_MENU],
        ],
        true,
    )
}

pub fn transaction_types() -> Keyboard {
    let names: Vec<String> = TransactionType::ALL
        .iter()
        .map(|t| t.as_str().to_string())
        .collect();
    Keyboard::paired(&names, BTN_BACK)
}

/// One numbered button per listed row
pub fn row_numbers(count: usize) -> Keyboard {
    let mut rows: Vec<Vec<String>> = (1..=count).map(|n| vec![n.to_string()]).collect();
    rows.push(vec![BTN_BACK_TO_MENU.to_string()]);
    Keyboard { rows, one_time: true }
}
