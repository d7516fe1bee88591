//! Transaction types, categories and accounts offered by the bot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pseudo-account holding money owed to the user
pub const RECEIVABLE_ACCOUNT: &str = "Receivable";

/// Pseudo-account a loan draw-down passes through before reaching a real account
pub const LOAN_CLEARING_ACCOUNT: &str = "Loan - clearing";

/// Category for expenses awaiting reimbursement; not counted as spend
pub const REIMBURSIBLES_CATEGORY: &str = "Reimbursibles";

/// Category used for loan interest and processing fees
pub const INTEREST_EXPENSE_CATEGORY: &str = "Interest expense";

/// The `type` column of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Expense,
    Income,
    Transfer,
    Reimbursement,
    Loan,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::Expense,
        TransactionType::Income,
        TransactionType::Transfer,
        TransactionType::Reimbursement,
        TransactionType::Loan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Expense => "Expense",
            TransactionType::Income => "Income",
            TransactionType::Transfer => "Transfer",
            TransactionType::Reimbursement => "Reimbursement",
            TransactionType::Loan => "Loan",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// Which category list a prompt or validation draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFamily {
    Income,
    Expense,
}

impl CategoryFamily {
    /// Category family shown when editing a row of the given type
    pub fn for_type(tx_type: &str) -> Self {
        if tx_type == TransactionType::Income.as_str() {
            CategoryFamily::Income
        } else {
            CategoryFamily::Expense
        }
    }
}

/// Accounts and category lists the user can pick from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub accounts: Vec<String>,
    pub income_categories: Vec<String>,
    pub expense_categories: Vec<String>,
    pub reimbursement_categories: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        }

        Self {
            accounts: owned(&[
                "Cash",
                "Maribank",
                "BDO",
                "BPI",
                "Gcash",
                "Maya",
                "Savings - eC-Savings",
                "EF – UnoDigital",
                "BPI - Platinum MC",
                "Eastwest - Gold MC",
                "Unionbank - Platinum Visa",
                "Settle Up",
                RECEIVABLE_ACCOUNT,
                LOAN_CLEARING_ACCOUNT,
            ]),
            income_categories: owned(&[
                "Salary",
                "Interest income",
                "Investment income",
                "Affiliate income",
            ]),
            expense_categories: owned(&[
                "Food",
                "Fastfood",
                "Hygiene",
                "Bills",
                "Gym",
                "Motorcycle",
                "MExp",
                "Cats",
                "Investment",
                INTEREST_EXPENSE_CATEGORY,
                REIMBURSIBLES_CATEGORY,
                "Other expenses",
            ]),
            reimbursement_categories: owned(&[REIMBURSIBLES_CATEGORY]),
        }
    }
}

impl Catalog {
    /// Replace the account list, keeping the sentinel accounts selectable
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        for sentinel in [RECEIVABLE_ACCOUNT, LOAN_CLEARING_ACCOUNT] {
            if !self.accounts.iter().any(|a| a == sentinel) {
                self.accounts.push(sentinel.to_string());
            }
        }
        self
    }

    pub fn categories(&self, family: CategoryFamily) -> &[String] {
        match family {
            CategoryFamily::Income => &self.income_categories,
            CategoryFamily::Expense => &self.expense_categories,
        }
    }

    pub fn is_account(&self, text: &str) -> bool {
        self.accounts.iter().any(|a| a == text)
    }

    /// Category check for the add flows: scoped to one family
    pub fn is_category(&self, family: CategoryFamily, text: &str) -> bool {
        self.categories(family).iter().any(|c| c == text)
    }

    /// Category check for the edit flow: any known category
    pub fn is_any_category(&self, text: &str) -> bool {
        self.income_categories
            .iter()
            .chain(&self.expense_categories)
            .chain(&self.reimbursement_categories)
            .any(|c| c == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_round_trips_through_text() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>(), Ok(t));
        }
        assert!("expense".parse::<TransactionType>().is_err());
    }

    #[test]
    fn add_flow_categories_are_family_scoped() {
        let catalog = Catalog::default();
        assert!(catalog.is_category(CategoryFamily::Expense, "Food"));
        assert!(!catalog.is_category(CategoryFamily::Income, "Food"));
        assert!(catalog.is_category(CategoryFamily::Income, "Salary"));
        assert!(!catalog.is_category(CategoryFamily::Expense, "Salary"));
    }

    #[test]
    fn edit_flow_accepts_union_of_categories() {
        let catalog = Catalog::default();
        assert!(catalog.is_any_category("Food"));
        assert!(catalog.is_any_category("Salary"));
        assert!(catalog.is_any_category(REIMBURSIBLES_CATEGORY));
        assert!(!catalog.is_any_category("Groceries"));
    }

    #[test]
    fn custom_accounts_keep_sentinels() {
        let catalog = Catalog::default().with_accounts(vec!["Wallet".to_string()]);
        assert!(catalog.is_account("Wallet"));
        assert!(catalog.is_account(RECEIVABLE_ACCOUNT));
        assert!(catalog.is_account(LOAN_CLEARING_ACCOUNT));
        assert!(!catalog.is_account("Cash"));
    }

    #[test]
    fn edit_category_family_follows_row_type() {
        assert_eq!(CategoryFamily::for_type("Income"), CategoryFamily::Income);
        assert_eq!(CategoryFamily::for_type("Expense"), CategoryFamily::Expense);
        assert_eq!(CategoryFamily::for_type("Transfer"), CategoryFamily::Expense);
    }
}
