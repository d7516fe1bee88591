//! Ledger rows and the spreadsheet they live in
//!
//! The store itself is an external collaborator reached through
//! [`LedgerGateway`]. Loan schedules and period summaries are derived here
//! from plain rows.

mod error;
mod gateway;
pub mod loan;
mod row;
pub mod sheets;
pub mod summary;

pub use error::{PersistenceError, PersistenceErrorKind};
pub use gateway::{LedgerGateway, LoggingGateway};
pub use row::{LedgerRow, RowField, RowSnapshot, SheetRow};
