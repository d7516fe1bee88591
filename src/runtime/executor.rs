//! Effect executor
//!
//! Runs the effects a transition asks for against the ledger store and turns
//! each into a reply for the user or an event for the state machine.

use crate::format::Locale;
use crate::ledger::loan::{generate_schedule, next_loan_number, LoanOffsets, LoanTerms};
use crate::ledger::summary::{aggregate, RowDateParser};
use crate::ledger::{LedgerGateway, PersistenceError, RowField, RowSnapshot};
use crate::state_machine::prompts::{self, Operation};
use crate::state_machine::{Effect, Event, Reply};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Rows shown by "View Recent"
pub const RECENT_LIMIT: usize = 5;

/// Loan numbering settings
#[derive(Debug, Clone)]
pub struct LoanSettings {
    pub offsets: LoanOffsets,
    /// Account the proceeds are moved into
    pub disbursement_account: String,
}

/// What running one effect produced
#[derive(Debug)]
pub enum Outcome {
    Reply(Reply),
    /// Fed back into the state machine
    Event(Event),
}

/// One async lock per loan account, so numbering and appending a loan for
/// the same account never overlap within this process
#[derive(Default)]
struct AccountLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    async fn for_account(&self, account: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(account.to_string()).or_default())
    }
}

pub struct EffectExecutor<G: LedgerGateway> {
    gateway: G,
    locale: Locale,
    dates: RowDateParser,
    loans: LoanSettings,
    loan_locks: AccountLocks,
}

impl<G: LedgerGateway> EffectExecutor<G> {
    pub fn new(gateway: G, locale: Locale, loans: LoanSettings) -> Self {
        let dates = RowDateParser::new(locale.timestamp_format.clone());
        Self {
            gateway,
            locale,
            dates,
            loans,
            loan_locks: AccountLocks::default(),
        }
    }

    pub async fn execute(&self, effect: Effect) -> Outcome {
        match effect {
            Effect::Reply(reply) => Outcome::Reply(reply),

            Effect::AppendRows { rows, confirmation } => {
                match self.gateway.append_batch(&rows).await {
                    Ok(()) => {
                        tracing::info!(rows = rows.len(), "Rows saved");
                        done(confirmation)
                    }
                    Err(e) => failed(Operation::Save, &e),
                }
            }

            Effect::LoadListing { purpose } => match self.gateway.read_all().await {
                Ok(rows) => {
                    tracing::debug!(?purpose, rows = rows.len(), "Listing loaded");
                    Outcome::Event(Event::ListingLoaded { rows })
                }
                Err(error) => Outcome::Event(Event::ListingFailed { error }),
            },

            Effect::CreateLoan { terms, timestamp } => {
                match self.create_loan(&terms, &timestamp).await {
                    Ok(text) => done(text),
                    Err(e) => failed(Operation::CreateLoan, &e),
                }
            }

            Effect::DeleteRow { row, confirmation } => match self.delete(&row).await {
                Ok(()) => done(confirmation),
                Err(e) => failed(Operation::Delete, &e),
            },

            Effect::UpdateCell {
                row,
                field,
                value,
                confirmation,
            } => match self.update(&row, field, &value).await {
                Ok(()) => done(confirmation),
                Err(e) => failed(Operation::Update, &e),
            },

            Effect::Summarize { start, end, period } => {
                match self.gateway.read_range(start, end, &self.dates).await {
                    Ok(rows) => {
                        let summary = aggregate(&rows);
                        done(prompts::summary_report(&period, start, end, &summary, &self.locale))
                    }
                    Err(e) => failed(Operation::Summarize, &e),
                }
            }

            Effect::ShowRecent => match self.gateway.read_recent(RECENT_LIMIT).await {
                Ok(rows) => done(prompts::recent(&rows, &self.locale)),
                Err(e) => failed(Operation::ShowRecent, &e),
            },
        }
    }

    /// Number, build and append a loan while holding its account's lock
    async fn create_loan(&self, terms: &LoanTerms, timestamp: &str) -> Result<String, PersistenceError> {
        let lock = self.loan_locks.for_account(&terms.account).await;
        let _guard = lock.lock().await;

        let existing = self.gateway.read_all().await?;
        let loan_number = next_loan_number(&existing, &terms.account, &self.loans.offsets);
        let rows = generate_schedule(terms, loan_number, &self.loans.disbursement_account, timestamp)
            .map_err(|e| PersistenceError::invalid_request(e.to_string()))?;

        self.gateway.append_batch(&rows).await?;
        tracing::info!(
            account = %terms.account,
            loan_number,
            rows = rows.len(),
            "Loan schedule created"
        );
        Ok(prompts::loan_created(terms, loan_number, rows.len(), &self.locale))
    }

    async fn delete(&self, row: &RowSnapshot) -> Result<(), PersistenceError> {
        self.ensure_unchanged(row).await?;
        self.gateway.delete_row(row.position).await?;
        tracing::info!(position = row.position, "Row deleted");
        Ok(())
    }

    async fn update(&self, row: &RowSnapshot, field: RowField, value: &str) -> Result<(), PersistenceError> {
        self.ensure_unchanged(row).await?;
        self.gateway.update_cell(row.position, field, value).await?;
        tracing::info!(position = row.position, ?field, "Cell updated");
        Ok(())
    }

    /// The listed row must still sit at its position with the same values
    async fn ensure_unchanged(&self, row: &RowSnapshot) -> Result<(), PersistenceError> {
        let rows = self.gateway.read_all().await?;
        let current = row.position.checked_sub(1).and_then(|i| rows.get(i));
        match current {
            Some(cells) if row.matches(cells) => Ok(()),
            _ => {
                tracing::warn!(position = row.position, "Listed row changed before the action ran");
                Err(PersistenceError::stale_selection(format!(
                    "row {} no longer matches the listing",
                    row.position
                )))
            }
        }
    }
}

fn done(text: String) -> Outcome {
    Outcome::Reply(prompts::main_menu(&text))
}

fn failed(operation: Operation, error: &PersistenceError) -> Outcome {
    tracing::error!(?operation, kind = ?error.kind, error = %error.message, "Ledger operation failed");
    Outcome::Reply(prompts::failure(operation, error))
}
