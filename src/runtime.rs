//! Runtime for handling chat messages
//!
//! One message is handled to completion while its user's session is locked:
//! the state machine runs, its effects are executed against the ledger, and
//! any events they produce are fed back until nothing is left to do.

mod executor;
mod sessions;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{EffectExecutor, LoanSettings, Outcome, RECENT_LIMIT};
pub use sessions::SessionStore;
pub use traits::*;

use crate::auth::{Authorizer, UNAUTHORIZED_MESSAGE};
use crate::catalog::Catalog;
use crate::format::Locale;
use crate::keyboards::Keyboard;
use crate::ledger::LedgerGateway;
use crate::state_machine::{transition, ConvContext, Event, Reply};
use std::collections::VecDeque;
use std::sync::Arc;

/// Type alias for the runtime wired in `main`
pub type ProductionRuntime = BotRuntime<Arc<dyn LedgerGateway>>;

/// Owns every session and the collaborators messages are handled with
pub struct BotRuntime<G: LedgerGateway> {
    executor: EffectExecutor<G>,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    sessions: SessionStore,
    catalog: Catalog,
    locale: Locale,
}

impl<G: LedgerGateway> BotRuntime<G> {
    pub fn new(
        gateway: G,
        authorizer: Arc<dyn Authorizer>,
        catalog: Catalog,
        locale: Locale,
        loans: LoanSettings,
    ) -> Self {
        Self {
            executor: EffectExecutor::new(gateway, locale.clone(), loans),
            authorizer,
            clock: Arc::new(SystemClock),
            sessions: SessionStore::new(),
            catalog,
            locale,
        }
    }

    /// Replace the clock
    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message and return the replies to send, in order.
    ///
    /// Unauthorized senders get a fixed denial and no session.
    pub async fn handle_message(&self, user_id: i64, chat_id: i64, text: &str) -> Vec<Reply> {
        if !self.authorizer.is_authorized(user_id) {
            tracing::warn!(user_id, chat_id, "Unauthorized sender");
            return vec![Reply::new(UNAUTHORIZED_MESSAGE, Keyboard::none())];
        }

        let slot = self.sessions.slot(user_id).await;
        let mut session = slot.lock().await;
        let ctx = ConvContext::new(&self.catalog, &self.locale, self.clock.now());

        let mut replies = Vec::new();
        let mut pending = VecDeque::from([Event::user_message(text)]);

        // Process events in a loop - no recursion
        while let Some(event) = pending.pop_front() {
            let result = match transition(&session, &ctx, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Event rejected");
                    continue;
                }
            };
            *session = result.new_session;

            for effect in result.effects {
                match self.executor.execute(effect).await {
                    Outcome::Reply(reply) => replies.push(reply),
                    Outcome::Event(event) => pending.push_back(event),
                }
            }
        }

        tracing::debug!(
            user_id,
            chat_id,
            replies = replies.len(),
            idle = session.state.is_idle(),
            history = session.history.len(),
            "Message handled"
        );
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{header_row, FixedClock, GatewayCall, MockGateway};
    use super::*;
    use crate::auth::AllowList;
    use crate::catalog::TransactionType;
    use crate::keyboards;
    use crate::ledger::loan::{LoanOffsets, DEFAULT_DISBURSEMENT_ACCOUNT};
    use crate::ledger::{PersistenceError, SheetRow};
    use crate::state_machine::prompts;
    use crate::state_machine::{ConvState, Session};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    const OWNER: i64 = 42;

    fn runtime(gateway: &Arc<MockGateway>) -> BotRuntime<Arc<MockGateway>> {
        BotRuntime::new(
            Arc::clone(gateway),
            Arc::new(AllowList::new([OWNER])),
            Catalog::default(),
            Locale::default(),
            LoanSettings {
                offsets: LoanOffsets::default(),
                disbursement_account: DEFAULT_DISBURSEMENT_ACCOUNT.to_string(),
            },
        )
        .with_clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 10, 18, 2, 30, 0).unwrap(),
        )))
    }

    async fn say(runtime: &BotRuntime<Arc<MockGateway>>, text: &str) -> Vec<Reply> {
        runtime.handle_message(OWNER, OWNER, text).await
    }

    fn sheet_row(cells: [&str; 7]) -> SheetRow {
        cells.map(String::from).to_vec()
    }

    #[tokio::test]
    async fn expense_end_to_end() {
        let gateway = Arc::new(MockGateway::with_rows(vec![header_row()]));
        let runtime = runtime(&gateway);

        for text in [keyboards::BTN_ADD_EXPENSE, "Food", "Cash", "lunch"] {
            assert_eq!(say(&runtime, text).await.len(), 1);
        }
        let replies = say(&runtime, "250").await;

        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.starts_with("✅ <b>Saved!</b>"));
        assert_eq!(replies[0].keyboard, keyboards::main_menu());

        assert_eq!(gateway.writes(), 1);
        let rows = gateway.appended_rows();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(
            (
                row.date.as_str(),
                row.tx_type,
                row.category.as_str(),
                row.account1.as_str(),
                row.account2.as_str(),
                row.description.as_str(),
                row.amount,
            ),
            (
                "10/18/2026, 10:30:00 AM",
                TransactionType::Expense,
                "Food",
                "Cash",
                "",
                "lunch",
                dec!(-250),
            )
        );

        assert_eq!(runtime.sessions().snapshot(OWNER).await, Some(Session::default()));
    }

    #[tokio::test]
    async fn unauthorized_sender_is_denied_without_side_effects() {
        let gateway = Arc::new(MockGateway::with_rows(vec![header_row()]));
        let runtime = runtime(&gateway);

        let replies = runtime.handle_message(7, 7, keyboards::BTN_ADD_EXPENSE).await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, UNAUTHORIZED_MESSAGE);
        assert!(replies[0].keyboard.is_empty());
        assert!(runtime.sessions().is_empty().await);
        assert!(gateway.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn delete_flow_reads_lists_and_deletes() {
        let gateway = Arc::new(MockGateway::with_rows(vec![
            header_row(),
            sheet_row(["d1", "Expense", "Food", "Cash", "", "lunch", "-250"]),
            sheet_row(["d2", "Income", "Salary", "BDO", "", "pay", "1000"]),
        ]));
        let runtime = runtime(&gateway);

        let replies = say(&runtime, keyboards::BTN_DELETE).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.starts_with("🗑️ <b>Delete Transaction</b>"));

        let replies = say(&runtime, "1").await;
        assert!(replies[0].text.starts_with("✅ <b>Transaction Deleted!</b>"));
        assert_eq!(gateway.rows().len(), 2);
        assert_eq!(gateway.rows()[1][5], "pay");
        assert!(gateway
            .recorded_calls()
            .contains(&GatewayCall::DeleteRow(2)));
    }

    #[tokio::test]
    async fn failed_listing_resets_to_menu() {
        let gateway = Arc::new(MockGateway::with_rows(vec![header_row()]));
        gateway.queue_error(PersistenceError::auth("expired"));
        let runtime = runtime(&gateway);

        let replies = say(&runtime, keyboards::BTN_EDIT).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, "❌ Error loading transactions.");
        let session = runtime.sessions().snapshot(OWNER).await.unwrap();
        assert!(session.state.is_idle());
    }

    #[tokio::test]
    async fn persistence_failure_discards_the_draft() {
        let gateway = Arc::new(MockGateway::with_rows(vec![header_row()]));
        let runtime = runtime(&gateway);

        for text in [keyboards::BTN_ADD_INCOME, "Salary", "BDO", "pay"] {
            say(&runtime, text).await;
        }
        gateway.queue_error(PersistenceError::server_error("boom"));
        let replies = say(&runtime, "1000").await;

        assert_eq!(replies[0].text, "❌ Error saving. Try again.");
        assert_eq!(runtime.sessions().snapshot(OWNER).await, Some(Session::default()));
        assert!(gateway.appended_rows().is_empty());
    }

    #[tokio::test]
    async fn edit_amount_end_to_end() {
        let gateway = Arc::new(MockGateway::with_rows(vec![
            header_row(),
            sheet_row(["d1", "Expense", "Food", "Cash", "", "lunch", "-250"]),
        ]));
        let runtime = runtime(&gateway);

        say(&runtime, keyboards::BTN_EDIT).await;
        say(&runtime, "1").await;
        say(&runtime, keyboards::BTN_EDIT_AMOUNT).await;
        let replies = say(&runtime, "300").await;

        assert!(replies[0].text.starts_with("✅ <b>Amount Updated!</b>"));
        assert_eq!(gateway.rows()[1][6], "-300");
    }

    #[tokio::test]
    async fn back_returns_to_previous_prompt() {
        let gateway = Arc::new(MockGateway::with_rows(vec![header_row()]));
        let runtime = runtime(&gateway);

        say(&runtime, keyboards::BTN_ADD_EXPENSE).await;
        say(&runtime, "Food").await;
        let replies = say(&runtime, keyboards::BTN_BACK).await;

        assert_eq!(replies[0].text, "Select category:");
        let session = runtime.sessions().snapshot(OWNER).await.unwrap();
        assert!(matches!(session.state, ConvState::Entry { .. }));
        assert_eq!(session.history, vec![ConvState::Idle]);
    }

    #[tokio::test]
    async fn start_greets() {
        let gateway = Arc::new(MockGateway::default());
        let runtime = runtime(&gateway);
        let replies = say(&runtime, "/start").await;
        assert_eq!(replies[0].text, prompts::WELCOME);
    }
}
