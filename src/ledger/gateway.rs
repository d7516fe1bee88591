//! The consumed contract of the ledger store

use super::summary::{filter_by_range, RowDateParser};
use super::{LedgerRow, PersistenceError, RowField, SheetRow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Row storage backing the ledger.
///
/// Positions are 1-based and count the header row, so the first data row
/// is position 2.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Append rows in a single call
    async fn append_batch(&self, rows: &[LedgerRow]) -> Result<(), PersistenceError>;

    /// Every row including the header at index 0
    async fn read_all(&self) -> Result<Vec<SheetRow>, PersistenceError>;

    /// Overwrite one cell
    async fn update_cell(
        &self,
        position: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), PersistenceError>;

    async fn delete_row(&self, position: usize) -> Result<(), PersistenceError>;

    /// The last `limit` data rows, oldest first
    async fn read_recent(&self, limit: usize) -> Result<Vec<SheetRow>, PersistenceError> {
        let mut rows = self.read_all().await?;
        if rows.is_empty() {
            return Ok(rows);
        }
        rows.remove(0);
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.split_off(skip))
    }

    /// Data rows dated within `[start, end]`
    async fn read_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        parser: &RowDateParser,
    ) -> Result<Vec<SheetRow>, PersistenceError> {
        let rows = self.read_all().await?;
        Ok(filter_by_range(&rows, start, end, parser))
    }
}

#[async_trait]
impl<T: LedgerGateway + ?Sized> LedgerGateway for Arc<T> {
    async fn append_batch(&self, rows: &[LedgerRow]) -> Result<(), PersistenceError> {
        (**self).append_batch(rows).await
    }

    async fn read_all(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        (**self).read_all().await
    }

    async fn update_cell(
        &self,
        position: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), PersistenceError> {
        (**self).update_cell(position, field, value).await
    }

    async fn delete_row(&self, position: usize) -> Result<(), PersistenceError> {
        (**self).delete_row(position).await
    }
}

/// Logging and time-bounding wrapper around a gateway
pub struct LoggingGateway {
    inner: Arc<dyn LedgerGateway>,
    timeout: Duration,
}

impl LoggingGateway {
    pub fn new(inner: Arc<dyn LedgerGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn observe<T, F>(&self, op: &'static str, call: F) -> Result<T, PersistenceError>
    where
        T: Send,
        F: Future<Output = Result<T, PersistenceError>> + Send,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PersistenceError::timeout(format!(
                "{op} did not finish within {}s",
                self.timeout.as_secs()
            ))),
        };
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    op,
                    duration_ms = %duration.as_millis(),
                    "Ledger call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    op,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Ledger call failed"
                );
            }
        }

        result
    }
}

#[async_trait]
impl LedgerGateway for LoggingGateway {
    async fn append_batch(&self, rows: &[LedgerRow]) -> Result<(), PersistenceError> {
        tracing::debug!(rows = rows.len(), "Appending rows");
        self.observe("append", self.inner.append_batch(rows)).await
    }

    async fn read_all(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        self.observe("read_all", self.inner.read_all()).await
    }

    async fn update_cell(
        &self,
        position: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), PersistenceError> {
        tracing::debug!(position, field = ?field, "Updating cell");
        self.observe("update_cell", self.inner.update_cell(position, field, value))
            .await
    }

    async fn delete_row(&self, position: usize) -> Result<(), PersistenceError> {
        tracing::debug!(position, "Deleting row");
        self.observe("delete_row", self.inner.delete_row(position))
            .await
    }
}
