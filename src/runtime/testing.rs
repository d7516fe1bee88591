//! Mock implementations for testing
//!
//! These mocks enable end-to-end testing of the handler without a real
//! spreadsheet or clock.

use super::traits::Clock;
use crate::ledger::{LedgerGateway, LedgerRow, PersistenceError, RowField, SheetRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// The sheet header as a row
pub fn header_row() -> SheetRow {
    ["Date", "Type", "Category", "Account 1", "Account 2", "Description", "Amount"]
        .map(String::from)
        .to_vec()
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// A call made against [`MockGateway`]
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    AppendBatch(Vec<LedgerRow>),
    ReadAll,
    UpdateCell {
        position: usize,
        field: RowField,
        value: String,
    },
    DeleteRow(usize),
}

/// In-memory sheet with call recording and queued failures
#[allow(dead_code)]
#[derive(Default)]
pub struct MockGateway {
    rows: Mutex<Vec<SheetRow>>,
    errors: Mutex<VecDeque<PersistenceError>>,
    delay: Option<Duration>,
    /// Record of all calls made
    pub calls: Mutex<Vec<GatewayCall>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn with_rows(rows: Vec<SheetRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Delay every call, for timeout tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next call with `error`
    pub fn queue_error(&self, error: PersistenceError) {
        self.errors.lock().unwrap().push_back(error);
    }

    pub fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn recorded_calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Every row passed to an append, in order
    pub fn appended_rows(&self) -> Vec<LedgerRow> {
        self.recorded_calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::AppendBatch(rows) => Some(rows),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Calls that change the sheet
    pub fn writes(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|c| !matches!(c, GatewayCall::ReadAll))
            .count()
    }

    async fn begin(&self, call: GatewayCall) -> Result<(), PersistenceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.errors.lock().unwrap().pop_front();
        match queued {
            Some(error) => Err(error),
            None => {
                self.calls.lock().unwrap().push(call);
                Ok(())
            }
        }
    }

    fn index(position: usize, len: usize) -> Result<usize, PersistenceError> {
        position
            .checked_sub(1)
            .filter(|i| *i < len)
            .ok_or_else(|| PersistenceError::invalid_request(format!("no row at position {position}")))
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn append_batch(&self, rows: &[LedgerRow]) -> Result<(), PersistenceError> {
        self.begin(GatewayCall::AppendBatch(rows.to_vec())).await?;
        let mut sheet = self.rows.lock().unwrap();
        sheet.extend(rows.iter().map(|r| r.to_cells().to_vec()));
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        self.begin(GatewayCall::ReadAll).await?;
        Ok(self.rows())
    }

    async fn update_cell(
        &self,
        position: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), PersistenceError> {
        self.begin(GatewayCall::UpdateCell {
            position,
            field,
            value: value.to_string(),
        })
        .await?;
        let mut sheet = self.rows.lock().unwrap();
        let index = Self::index(position, sheet.len())?;
        let row = &mut sheet[index];
        if row.len() <= field.index() {
            row.resize(field.index() + 1, String::new());
        }
        row[field.index()] = value.to_string();
        Ok(())
    }

    async fn delete_row(&self, position: usize) -> Result<(), PersistenceError> {
        self.begin(GatewayCall::DeleteRow(position)).await?;
        let mut sheet = self.rows.lock().unwrap();
        let index = Self::index(position, sheet.len())?;
        sheet.remove(index);
        Ok(())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

/// Clock pinned to one instant
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
