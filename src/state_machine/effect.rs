//! Effects produced by state transitions

use super::state::ListingPurpose;
use crate::keyboards::Keyboard;
use crate::ledger::loan::LoanTerms;
use crate::ledger::{LedgerRow, RowField, RowSnapshot};
use chrono::NaiveDate;

/// One outbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTML-formatted text
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

/// Effects to be executed after a state transition.
///
/// Persisting effects carry the confirmation to send once the store accepts
/// the change; on failure the executor sends an apology instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message
    Reply(Reply),

    /// Append rows in one call
    AppendRows {
        rows: Vec<LedgerRow>,
        confirmation: String,
    },

    /// Read the sheet and feed the listing back as an event
    LoadListing { purpose: ListingPurpose },

    /// Number, build and append a loan schedule
    CreateLoan { terms: LoanTerms, timestamp: String },

    /// Delete a listed row if it is still where it was shown
    DeleteRow {
        row: RowSnapshot,
        confirmation: String,
    },

    /// Overwrite one cell of a listed row if it is still where it was shown
    UpdateCell {
        row: RowSnapshot,
        field: RowField,
        value: String,
        confirmation: String,
    },

    /// Report income and spend for an inclusive date range
    Summarize {
        start: NaiveDate,
        end: NaiveDate,
        period: String,
    },

    /// Show the last few rows
    ShowRecent,
}

impl Effect {
    pub fn append(row: LedgerRow, confirmation: String) -> Self {
        Effect::AppendRows {
            rows: vec![row],
            confirmation,
        }
    }
}
