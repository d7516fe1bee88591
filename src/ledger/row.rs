//! The seven-column row layout shared with the spreadsheet

use crate::catalog::TransactionType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cells of one sheet row exactly as the store returns them.
/// Trailing empty cells may be missing.
pub type SheetRow = Vec<String>;

/// A row to append: date, type, category, account1, account2, description, amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: String,
    pub tx_type: TransactionType,
    pub category: String,
    pub account1: String,
    pub account2: String,
    pub description: String,
    pub amount: Decimal,
}

impl LedgerRow {
    /// Build a row, forcing expenses to a non-positive amount
    pub fn new(
        date: impl Into<String>,
        tx_type: TransactionType,
        category: impl Into<String>,
        account1: impl Into<String>,
        account2: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        let amount = if tx_type == TransactionType::Expense {
            -amount.abs()
        } else {
            amount
        };
        Self {
            date: date.into(),
            tx_type,
            category: category.into(),
            account1: account1.into(),
            account2: account2.into(),
            description: description.into(),
            amount,
        }
    }

    /// Cell values in column order, as sent to the store
    pub fn to_cells(&self) -> [String; 7] {
        [
            self.date.clone(),
            self.tx_type.as_str().to_string(),
            self.category.clone(),
            self.account1.clone(),
            self.account2.clone(),
            self.description.clone(),
            self.amount.to_string(),
        ]
    }
}

/// A column of the ledger sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowField {
    Date,
    Type,
    Category,
    Account1,
    Account2,
    Description,
    Amount,
}

impl RowField {
    pub const ALL: [RowField; 7] = [
        RowField::Date,
        RowField::Type,
        RowField::Category,
        RowField::Account1,
        RowField::Account2,
        RowField::Description,
        RowField::Amount,
    ];

    /// Zero-based cell index
    pub fn index(self) -> usize {
        match self {
            RowField::Date => 0,
            RowField::Type => 1,
            RowField::Category => 2,
            RowField::Account1 => 3,
            RowField::Account2 => 4,
            RowField::Description => 5,
            RowField::Amount => 6,
        }
    }

    /// Spreadsheet column letter
    pub fn column(self) -> char {
        match self {
            RowField::Date => 'A',
            RowField::Type => 'B',
            RowField::Category => 'C',
            RowField::Account1 => 'D',
            RowField::Account2 => 'E',
            RowField::Description => 'F',
            RowField::Amount => 'G',
        }
    }

    /// Human label used in edit prompts
    pub fn label(self) -> &'static str {
        match self {
            RowField::Date => "Date",
            RowField::Type => "Type",
            RowField::Category => "Category",
            RowField::Account1 => "Account 1",
            RowField::Account2 => "Account 2",
            RowField::Description => "Description",
            RowField::Amount => "Amount",
        }
    }
}

/// A row as it was shown to the user, pinned to its 1-based sheet position
/// (the header is position 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub position: usize,
    pub cells: SheetRow,
}

impl RowSnapshot {
    pub fn new(position: usize, cells: SheetRow) -> Self {
        Self { position, cells }
    }

    pub fn get(&self, field: RowField) -> &str {
        self.cells.get(field.index()).map_or("", String::as_str)
    }

    /// Whether `cells` still holds what this snapshot recorded,
    /// ignoring trailing empty cells the store may omit.
    pub fn matches(&self, cells: &[String]) -> bool {
        RowField::ALL.iter().all(|f| {
            let current = cells.get(f.index()).map_or("", String::as_str);
            current == self.get(*f)
        })
    }
}
