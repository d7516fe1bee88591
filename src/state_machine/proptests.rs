//! Property-based tests for the state machine
//!
//! Random button presses and typed text are driven through `transition`,
//! checking that navigation and sign rules hold for every path.

use super::state::*;
use super::transition::*;
use super::*;
use crate::catalog::{Catalog, TransactionType};
use crate::format::Locale;
use crate::keyboards;
use crate::ledger::{RowField, SheetRow};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

// ============================================================================
// Test Helpers
// ============================================================================

fn run(session: &Session, event: Event) -> Option<TransitionResult> {
    let catalog = Catalog::default();
    let locale = Locale::default();
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 2, 30, 0).unwrap();
    let ctx = ConvContext::new(&catalog, &locale, now);
    transition(session, &ctx, event).ok()
}

fn listing_rows() -> Vec<SheetRow> {
    let header = ["Date", "Type", "Category", "Account 1", "Account 2", "Description", "Amount"];
    let data = [
        ["10/01/2026", "Expense", "Food", "Cash", "", "lunch", "-250"],
        ["10/02/2026", "Income", "Salary", "BDO", "", "pay", "1000"],
        ["10/03/2026", "Transfer", "", "BDO", "Cash", "atm", "500"],
    ];
    std::iter::once(header.map(String::from).to_vec())
        .chain(data.iter().map(|r| r.map(String::from).to_vec()))
        .collect()
}

/// Feed a message, answering any listing request with a fixed sheet
fn step(session: &Session, text: &str) -> (Session, Vec<Effect>) {
    let Some(result) = run(session, Event::user_message(text)) else {
        return (session.clone(), vec![]);
    };
    let mut effects = result.effects;
    let mut session = result.new_session;
    if effects.iter().any(|e| matches!(e, Effect::LoadListing { .. })) {
        if let Some(loaded) = run(&session, Event::ListingLoaded { rows: listing_rows() }) {
            session = loaded.new_session;
            effects.extend(loaded.effects);
        }
    }
    (session, effects)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_button() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(keyboards::BTN_ADD_EXPENSE),
        Just(keyboards::BTN_ADD_INCOME),
        Just(keyboards::BTN_ADD_TRANSFER),
        Just(keyboards::BTN_ADD_REIMBURSEMENT),
        Just(keyboards::BTN_ADD_RECEIVABLE),
        Just(keyboards::BTN_ADD_PAYABLE),
        Just(keyboards::BTN_SUMMARY),
        Just(keyboards::BTN_DELETE),
        Just(keyboards::BTN_EDIT),
        Just(keyboards::BTN_BACK),
        Just(keyboards::BTN_NEW_RECEIVABLE),
        Just(keyboards::BTN_PAYMENT_RECEIVED),
        Just(keyboards::BTN_MONTHLY_SUMMARY),
        Just(keyboards::BTN_YEARLY_SUMMARY),
        Just(keyboards::BTN_EDIT_AMOUNT),
        Just(keyboards::BTN_EDIT_TYPE),
        Just(keyboards::BTN_EDIT_DATE),
    ]
    .prop_map(String::from)
}

fn arb_choice() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Food"),
        Just("Salary"),
        Just("Cash"),
        Just("BDO"),
        Just("BPI - Platinum MC"),
        Just("Expense"),
        Just("Income"),
        Just("12/15/2024"),
        Just("02/30/2024"),
        Just("📅 2026"),
        Just("📅 March"),
        Just("1"),
        Just("2"),
        Just("12"),
    ]
    .prop_map(String::from)
}

fn arb_amount() -> impl Strategy<Value = String> {
    (any::<bool>(), 0u32..100_000, 0u32..100).prop_map(|(negative, whole, cents)| {
        let sign = if negative { "-" } else { "" };
        format!("{sign}{whole}.{cents:02}")
    })
}

fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_button(),
        4 => arb_choice(),
        2 => arb_amount(),
        1 => "[a-z ]{0,12}",
    ]
}

fn arb_inputs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_input(), 0..40)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// History never grows past the deepest flow
    #[test]
    fn history_is_bounded(inputs in arb_inputs()) {
        let mut session = Session::default();
        for text in &inputs {
            session = step(&session, text).0;
            prop_assert!(session.history.len() <= MAX_HISTORY_DEPTH);
        }
    }

    /// History grows by at most one per message, and back never grows it
    #[test]
    fn history_moves_one_step_at_a_time(inputs in arb_inputs()) {
        let mut session = Session::default();
        for text in &inputs {
            let before = session.history.len();
            session = step(&session, text).0;
            let after = session.history.len();
            if text == keyboards::BTN_BACK {
                prop_assert!(after < before || after == 0);
            } else {
                prop_assert!(after <= before + 1);
            }
        }
    }

    /// Going forward then back lands on the same session
    #[test]
    fn back_undoes_a_forward_step(inputs in arb_inputs(), next in arb_input()) {
        let mut session = Session::default();
        for text in &inputs {
            session = step(&session, text).0;
        }
        let (forward, _) = step(&session, &next);
        let pushed = forward.history.len() == session.history.len() + 1
            && forward.history.last() == Some(&session.state);
        if pushed {
            let (back, _) = step(&forward, keyboards::BTN_BACK);
            if session.state.is_idle() {
                prop_assert_eq!(back, Session::default());
            } else {
                prop_assert_eq!(back, session);
            }
        }
    }

    /// Back with nothing to go back to is the same as back to menu
    #[test]
    fn back_on_empty_history_is_back_to_menu(inputs in arb_inputs()) {
        let mut session = Session::default();
        for text in &inputs {
            session = step(&session, text).0;
        }
        session.history.clear();
        let back = run(&session, Event::user_message(keyboards::BTN_BACK)).unwrap();
        let menu = run(&session, Event::user_message(keyboards::BTN_BACK_TO_MENU)).unwrap();
        prop_assert_eq!(&back.new_session, &menu.new_session);
        prop_assert_eq!(back.effects, menu.effects);
    }

    /// Rejected input never moves the session
    #[test]
    fn rejected_input_changes_nothing(inputs in arb_inputs(), junk in "[a-z]{3,10}") {
        let mut session = Session::default();
        for text in &inputs {
            session = step(&session, text).0;
        }
        // Free text is always valid, and unparsable amounts read as an
        // accepted zero where zero is allowed
        let accepts_anything = matches!(
            session.state,
            ConvState::Entry { step: EntryStep::Description, .. }
                | ConvState::Receivable { step: ReceivableStep::Description, .. }
                | ConvState::Payable {
                    step: PayableStep::Description | PayableStep::Interest | PayableStep::Fee,
                    ..
                }
                | ConvState::Edit { step: EditStep::Input(_, RowField::Description), .. }
        );
        if !session.state.is_idle() && !accepts_anything {
            let (after, effects) = step(&session, &junk);
            prop_assert_eq!(after, session);
            prop_assert!(effects.iter().all(|e| matches!(e, Effect::Reply(_))));
        }
    }

    /// Every expense written or edited carries a non-positive amount
    #[test]
    fn expense_amounts_stay_non_positive(inputs in arb_inputs()) {
        let mut session = Session::default();
        for text in &inputs {
            let (after, effects) = step(&session, text);
            for effect in &effects {
                match effect {
                    Effect::AppendRows { rows, .. } => {
                        for row in rows.iter().filter(|r| r.tx_type == TransactionType::Expense) {
                            prop_assert!(row.amount <= Decimal::ZERO);
                        }
                    }
                    Effect::UpdateCell { row, field: RowField::Amount, value, .. }
                        if row.get(RowField::Type) == "Expense" =>
                    {
                        let amount: Decimal = value.parse().unwrap();
                        prop_assert!(amount <= Decimal::ZERO);
                    }
                    _ => {}
                }
            }
            session = after;
        }
    }
}
