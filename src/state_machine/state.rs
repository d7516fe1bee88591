//! Conversation state types

use crate::catalog::{Catalog, CategoryFamily, TransactionType, REIMBURSIBLES_CATEGORY};
use crate::format::Locale;
use crate::ledger::{RowField, RowSnapshot, SheetRow};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Deepest history a session can build: the payable flow pushes idle plus
/// seven steps before its last prompt
pub const MAX_HISTORY_DEPTH: usize = 8;

/// How many recent rows the delete and edit listings offer
pub const LISTING_WINDOW: usize = 10;

// ============================================================================
// Simple entries
// ============================================================================

/// The four single-row entry flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Expense,
    Income,
    Transfer,
    Reimbursement,
}

impl EntryKind {
    pub fn tx_type(self) -> TransactionType {
        match self {
            EntryKind::Expense => TransactionType::Expense,
            EntryKind::Income => TransactionType::Income,
            EntryKind::Transfer => TransactionType::Transfer,
            EntryKind::Reimbursement => TransactionType::Reimbursement,
        }
    }

    /// Category family offered at the category step, for kinds that have one
    pub fn family(self) -> Option<CategoryFamily> {
        match self {
            EntryKind::Expense => Some(CategoryFamily::Expense),
            EntryKind::Income => Some(CategoryFamily::Income),
            EntryKind::Transfer | EntryKind::Reimbursement => None,
        }
    }

    /// Category fixed by the kind when there is no category step
    pub fn fixed_category(self) -> &'static str {
        match self {
            EntryKind::Reimbursement => REIMBURSIBLES_CATEGORY,
            _ => "",
        }
    }

    pub fn has_destination(self) -> bool {
        self == EntryKind::Transfer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStep {
    Category,
    Account1,
    Account2,
    Description,
    Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub category: String,
    pub account1: String,
    pub account2: String,
    pub description: String,
}

impl EntryDraft {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            category: kind.fixed_category().to_string(),
            account1: String::new(),
            account2: String::new(),
            description: String::new(),
        }
    }
}

// ============================================================================
// Receivables
// ============================================================================

/// Money lent out, or money coming back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceivableKind {
    #[default]
    New,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceivableStep {
    Kind,
    Account,
    Description,
    Amount,
}

/// Drafted receivable transfer. `kind` is meaningful from the account step on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableDraft {
    pub kind: ReceivableKind,
    pub account1: String,
    pub account2: String,
    pub description: String,
}

// ============================================================================
// Payables (loans)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayableStep {
    Description,
    Proceeds,
    Account,
    BillingDate,
    Terms,
    Principal,
    Interest,
    Fee,
}

/// Loan terms collected so far; each field is set by the step of the same
/// name before the flow moves past it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableDraft {
    pub description: String,
    pub proceeds: Decimal,
    pub account: String,
    pub first_billing: String,
    pub term_count: u32,
    pub monthly_principal: Decimal,
    pub monthly_interest: Decimal,
}

// ============================================================================
// Delete and edit
// ============================================================================

/// Which flow asked for the recent-rows listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingPurpose {
    Delete,
    Edit,
}

/// Recent data rows as shown to the user, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub rows: Vec<RowSnapshot>,
}

impl Listing {
    /// The last [`LISTING_WINDOW`] data rows of a full read (header at index 0).
    ///
    /// Item `i` of `k` sits at position `total - (k - i)`, counting the header
    /// as position 1.
    pub fn from_sheet(rows: &[SheetRow]) -> Self {
        let data_rows = rows.len().saturating_sub(1);
        let first = rows.len() - data_rows.min(LISTING_WINDOW);
        Self {
            rows: rows
                .iter()
                .enumerate()
                .skip(first)
                .map(|(i, cells)| RowSnapshot::new(i + 1, cells.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Resolve a typed selection number
    pub fn select(&self, text: &str) -> Option<&RowSnapshot> {
        let n: usize = text.trim().parse().ok()?;
        n.checked_sub(1).and_then(|i| self.rows.get(i))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditStep {
    Select,
    Field(RowSnapshot),
    Input(RowSnapshot, RowField),
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryKind {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryStep {
    Kind,
    Year(SummaryKind),
    Month(i32),
}

// ============================================================================
// Conversation state
// ============================================================================

/// Where a user is in the conversation. Each flow carries only its own draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// At the main menu
    #[default]
    Idle,

    Entry {
        step: EntryStep,
        draft: EntryDraft,
    },

    Receivable {
        step: ReceivableStep,
        draft: ReceivableDraft,
    },

    Payable {
        step: PayableStep,
        draft: PayableDraft,
    },

    /// Recent rows are being read for a delete or edit listing
    Loading {
        purpose: ListingPurpose,
    },

    /// Waiting for the number of the row to delete
    Delete {
        listing: Listing,
    },

    Edit {
        listing: Listing,
        step: EditStep,
    },

    Summary {
        step: SummaryStep,
    },
}

impl ConvState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }
}

/// Per-user conversation record: the current state and the states it can
/// go back to, most recent last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: ConvState,
    pub history: Vec<ConvState>,
}

impl Session {
    /// A flow entered from the main menu: back returns to idle
    pub fn started(state: ConvState) -> Self {
        Self {
            state,
            history: vec![ConvState::Idle],
        }
    }

    /// Move forward, remembering where we came from
    pub fn advance(&self, next: ConvState) -> Self {
        let mut history = self.history.clone();
        history.push(self.state.clone());
        debug_assert!(history.len() <= MAX_HISTORY_DEPTH);
        Self {
            state: next,
            history,
        }
    }

    /// Previous state and the history left under it, if there is one
    pub fn back(&self) -> Option<Self> {
        let mut history = self.history.clone();
        let state = history.pop()?;
        Some(Self { state, history })
    }
}

/// Inputs to a transition that are not part of the session
#[derive(Debug, Clone)]
pub struct ConvContext<'a> {
    pub catalog: &'a Catalog,
    pub locale: &'a Locale,
    /// Local calendar day, for the year choices
    pub today: NaiveDate,
    /// `date` cell for rows created by this message
    pub timestamp: String,
}

impl<'a> ConvContext<'a> {
    pub fn new(catalog: &'a Catalog, locale: &'a Locale, now: DateTime<Utc>) -> Self {
        Self {
            catalog,
            locale,
            today: locale.today(now),
            timestamp: locale.timestamp(now),
        }
    }
}
