//! Pure state transition function
//!
//! Every accepted input pushes the state it leaves onto the session history
//! before moving on; rejected input leaves the session untouched and
//! re-prompts the current step.

use super::effect::{Effect, Reply};
use super::event::Event;
use super::prompts::{self, Operation};
use super::state::{
    ConvContext, ConvState, EditStep, EntryDraft, EntryKind, EntryStep, Listing,
    ListingPurpose, PayableDraft, PayableStep, ReceivableDraft, ReceivableKind,
    ReceivableStep, Session, SummaryKind, SummaryStep,
};
use crate::catalog::{CategoryFamily, TransactionType, RECEIVABLE_ACCOUNT};
use crate::format::escape_html;
use crate::keyboards::{self, BTN_BACK, BTN_BACK_TO_MENU, BTN_CANCEL};
use crate::ledger::loan::LoanTerms;
use crate::ledger::{LedgerRow, RowField, RowSnapshot, SheetRow};
use crate::validation::{
    is_strict_date, month_range, parse_amount, parse_month_button, parse_terms,
    parse_year_button, selectable_years, year_range, MONTH_NAMES,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same session, context and event always give the
/// same result, and nothing here touches the store.
pub fn transition(
    session: &Session,
    ctx: &ConvContext<'_>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserMessage { text } => on_message(session, ctx, text.trim()),

        Event::ListingLoaded { rows } => match session.state {
            ConvState::Loading { purpose } => Ok(on_listing(purpose, &rows, ctx)),
            _ => Err(TransitionError::InvalidTransition(
                "listing arrived outside of a loading state".to_string(),
            )),
        },

        Event::ListingFailed { error } => match session.state {
            ConvState::Loading { .. } => Ok(reset_with(prompts::failure(Operation::Load, &error))),
            _ => Err(TransitionError::InvalidTransition(
                "listing failure arrived outside of a loading state".to_string(),
            )),
        },
    }
}

fn on_message(
    session: &Session,
    ctx: &ConvContext<'_>,
    text: &str,
) -> Result<TransitionResult, TransitionError> {
    if let Some(result) = global_command(session, ctx, text) {
        return Ok(result);
    }
    if let Some(result) = menu_action(ctx, text) {
        return Ok(result);
    }

    let result = match &session.state {
        ConvState::Idle => reset_with(prompts::main_menu(prompts::USE_MENU)),
        ConvState::Loading { .. } => {
            return Err(TransitionError::InvalidTransition(
                "message arrived while the listing is loading".to_string(),
            ))
        }
        ConvState::Entry { step, draft } => entry(session, ctx, *step, draft, text),
        ConvState::Receivable { step, draft } => receivable(session, ctx, *step, draft, text),
        ConvState::Payable { step, draft } => payable(session, ctx, *step, draft, text),
        ConvState::Delete { listing } => delete(session, ctx, listing, text),
        ConvState::Edit { listing, step } => edit(session, ctx, listing, step, text),
        ConvState::Summary { step } => summary(session, ctx, *step, text),
    };
    Ok(result)
}

// ============================================================================
// Shared helpers
// ============================================================================

fn reply(session: Session, reply: Reply) -> TransitionResult {
    TransitionResult::new(session).with_effect(Effect::Reply(reply))
}

/// Back to idle with an empty history
fn reset_with(reply: Reply) -> TransitionResult {
    TransitionResult::new(Session::default()).with_effect(Effect::Reply(reply))
}

/// Invalid input: same session, same prompt, error in front
fn reject(session: &Session, ctx: &ConvContext<'_>, error: &str) -> TransitionResult {
    reply(session.clone(), prompts::reprompt(error, &session.state, ctx))
}

/// Valid input: push, move to `next`, acknowledge `value`
fn accept(
    session: &Session,
    ctx: &ConvContext<'_>,
    next: ConvState,
    label: &str,
    value: &str,
) -> TransitionResult {
    let text = prompts::acknowledged(label, &escape_html(value), &next, ctx);
    reply(session.advance(next), text)
}

/// Valid selection that needs no acknowledgement
fn advance_to(session: &Session, ctx: &ConvContext<'_>, next: ConvState) -> TransitionResult {
    let prompt = prompts::canonical(&next, ctx);
    reply(session.advance(next), prompt)
}

fn global_command(session: &Session, ctx: &ConvContext<'_>, text: &str) -> Option<TransitionResult> {
    if text == "/start" || text.starts_with("/start ") {
        return Some(reset_with(prompts::main_menu(prompts::WELCOME)));
    }
    match text {
        BTN_CANCEL => Some(reset_with(prompts::main_menu(prompts::CANCELLED))),
        BTN_BACK_TO_MENU => Some(reset_with(prompts::main_menu(prompts::MAIN_MENU))),
        BTN_BACK => Some(match session.back() {
            Some(previous) if !matches!(previous.state, ConvState::Idle | ConvState::Loading { .. }) => {
                let prompt = prompts::canonical(&previous.state, ctx);
                reply(previous, prompt)
            }
            _ => reset_with(prompts::main_menu(prompts::MAIN_MENU)),
        }),
        _ => None,
    }
}

/// Main-menu buttons start their flow from any state
fn menu_action(ctx: &ConvContext<'_>, text: &str) -> Option<TransitionResult> {
    let start = |state: ConvState| {
        let prompt = prompts::started(&state, ctx);
        reply(Session::started(state), prompt)
    };
    let entry = |kind: EntryKind| {
        let step = if kind.family().is_some() {
            EntryStep::Category
        } else {
            EntryStep::Account1
        };
        start(ConvState::Entry {
            step,
            draft: EntryDraft::new(kind),
        })
    };
    let load = |purpose: ListingPurpose| {
        TransitionResult::new(Session::started(ConvState::Loading { purpose }))
            .with_effect(Effect::LoadListing { purpose })
    };

    Some(match text {
        keyboards::BTN_ADD_EXPENSE => entry(EntryKind::Expense),
        keyboards::BTN_ADD_INCOME => entry(EntryKind::Income),
        keyboards::BTN_ADD_TRANSFER => entry(EntryKind::Transfer),
        keyboards::BTN_ADD_REIMBURSEMENT => entry(EntryKind::Reimbursement),
        keyboards::BTN_ADD_RECEIVABLE => start(ConvState::Receivable {
            step: ReceivableStep::Kind,
            draft: ReceivableDraft::default(),
        }),
        keyboards::BTN_ADD_PAYABLE => start(ConvState::Payable {
            step: PayableStep::Description,
            draft: PayableDraft::default(),
        }),
        keyboards::BTN_SUMMARY => start(ConvState::Summary {
            step: SummaryStep::Kind,
        }),
        keyboards::BTN_VIEW_RECENT => TransitionResult::new(Session::default()).with_effect(Effect::ShowRecent),
        keyboards::BTN_DELETE => load(ListingPurpose::Delete),
        keyboards::BTN_EDIT => load(ListingPurpose::Edit),
        _ => return None,
    })
}

// ============================================================================
// Simple entries
// ============================================================================

fn entry(
    session: &Session,
    ctx: &ConvContext<'_>,
    step: EntryStep,
    draft: &EntryDraft,
    text: &str,
) -> TransitionResult {
    let catalog = ctx.catalog;
    let next = |step: EntryStep, draft: EntryDraft| ConvState::Entry { step, draft };

    match step {
        EntryStep::Category => {
            let family = draft.kind.family().unwrap_or(CategoryFamily::Expense);
            if !catalog.is_category(family, text) {
                return reject(session, ctx, "Invalid. Select from buttons:");
            }
            let draft = EntryDraft {
                category: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(EntryStep::Account1, draft), "Category", text)
        }

        EntryStep::Account1 => {
            if !catalog.is_account(text) {
                return reject(session, ctx, "Invalid. Select from buttons:");
            }
            let draft = EntryDraft {
                account1: text.to_string(),
                ..draft.clone()
            };
            if draft.kind.has_destination() {
                accept(session, ctx, next(EntryStep::Account2, draft), "Source", text)
            } else {
                accept(session, ctx, next(EntryStep::Description, draft), "Account", text)
            }
        }

        EntryStep::Account2 => {
            if !catalog.is_account(text) {
                return reject(session, ctx, "Invalid. Select from buttons:");
            }
            let draft = EntryDraft {
                account2: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(EntryStep::Description, draft), "Destination", text)
        }

        EntryStep::Description => {
            if text.is_empty() {
                return reject(session, ctx, "Description cannot be empty.");
            }
            let draft = EntryDraft {
                description: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(EntryStep::Amount, draft), "Description", text)
        }

        EntryStep::Amount => {
            let amount = parse_amount(text);
            if amount <= Decimal::ZERO {
                return reject(session, ctx, "Invalid amount:");
            }
            let row = LedgerRow::new(
                ctx.timestamp.clone(),
                draft.kind.tx_type(),
                draft.category.clone(),
                draft.account1.clone(),
                draft.account2.clone(),
                draft.description.clone(),
                amount,
            );
            let confirmation = prompts::entry_saved(&row, ctx.locale);
            TransitionResult::new(Session::default()).with_effect(Effect::append(row, confirmation))
        }
    }
}

// ============================================================================
// Receivables
// ============================================================================

fn receivable(
    session: &Session,
    ctx: &ConvContext<'_>,
    step: ReceivableStep,
    draft: &ReceivableDraft,
    text: &str,
) -> TransitionResult {
    let next = |step: ReceivableStep, draft: ReceivableDraft| ConvState::Receivable { step, draft };

    match step {
        ReceivableStep::Kind => {
            let draft = match text {
                keyboards::BTN_NEW_RECEIVABLE => ReceivableDraft {
                    kind: ReceivableKind::New,
                    account2: RECEIVABLE_ACCOUNT.to_string(),
                    ..ReceivableDraft::default()
                },
                keyboards::BTN_PAYMENT_RECEIVED => ReceivableDraft {
                    kind: ReceivableKind::Payment,
                    account1: RECEIVABLE_ACCOUNT.to_string(),
                    ..ReceivableDraft::default()
                },
                _ => return reject(session, ctx, "Invalid. Select from buttons:"),
            };
            advance_to(session, ctx, next(ReceivableStep::Account, draft))
        }

        ReceivableStep::Account => {
            if !ctx.catalog.is_account(text) {
                return reject(session, ctx, "Invalid. Select from buttons:");
            }
            let draft = match draft.kind {
                ReceivableKind::New => ReceivableDraft {
                    account1: text.to_string(),
                    ..draft.clone()
                },
                ReceivableKind::Payment => ReceivableDraft {
                    account2: text.to_string(),
                    ..draft.clone()
                },
            };
            accept(session, ctx, next(ReceivableStep::Description, draft), "Account", text)
        }

        ReceivableStep::Description => {
            if text.is_empty() {
                return reject(session, ctx, "Description cannot be empty.");
            }
            let draft = ReceivableDraft {
                description: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(ReceivableStep::Amount, draft), "Description", text)
        }

        ReceivableStep::Amount => {
            let amount = parse_amount(text);
            if amount <= Decimal::ZERO {
                return reject(session, ctx, "Invalid amount. Enter a valid number:");
            }
            let row = LedgerRow::new(
                ctx.timestamp.clone(),
                TransactionType::Transfer,
                "",
                draft.account1.clone(),
                draft.account2.clone(),
                draft.description.clone(),
                amount,
            );
            let confirmation = prompts::receivable_saved(draft.kind, &row, ctx.locale);
            TransitionResult::new(Session::default()).with_effect(Effect::append(row, confirmation))
        }
    }
}

// ============================================================================
// Payables
// ============================================================================

fn payable(
    session: &Session,
    ctx: &ConvContext<'_>,
    step: PayableStep,
    draft: &PayableDraft,
    text: &str,
) -> TransitionResult {
    let next = |step: PayableStep, draft: PayableDraft| ConvState::Payable { step, draft };
    let money = |amount: Decimal| ctx.locale.currency(amount);

    match step {
        PayableStep::Description => {
            if text.is_empty() {
                return reject(session, ctx, "Description cannot be empty.");
            }
            let draft = PayableDraft {
                description: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::Proceeds, draft), "Description", text)
        }

        PayableStep::Proceeds => {
            let proceeds = parse_amount(text);
            if proceeds <= Decimal::ZERO {
                return reject(session, ctx, "Invalid amount. Enter a valid number:");
            }
            let draft = PayableDraft {
                proceeds,
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::Account, draft), "Amount", &money(proceeds))
        }

        PayableStep::Account => {
            if !ctx.catalog.is_account(text) {
                return reject(session, ctx, "Invalid. Select from buttons:");
            }
            let draft = PayableDraft {
                account: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::BillingDate, draft), "Account", text)
        }

        PayableStep::BillingDate => {
            if !is_strict_date(text) {
                return reject(session, ctx, "Invalid date format. Use MM/DD/YYYY");
            }
            let draft = PayableDraft {
                first_billing: text.to_string(),
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::Terms, draft), "First billing", text)
        }

        PayableStep::Terms => {
            let Some(term_count) = parse_terms(text) else {
                return reject(session, ctx, "Invalid number. Enter months (1-360):");
            };
            let draft = PayableDraft {
                term_count,
                ..draft.clone()
            };
            accept(
                session,
                ctx,
                next(PayableStep::Principal, draft),
                "Terms",
                &format!("{term_count} months"),
            )
        }

        PayableStep::Principal => {
            let principal = parse_amount(text);
            if principal <= Decimal::ZERO {
                return reject(session, ctx, "Invalid amount. Enter monthly principal:");
            }
            let draft = PayableDraft {
                monthly_principal: principal,
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::Interest, draft), "Principal", &money(principal))
        }

        PayableStep::Interest => {
            let interest = parse_amount(text);
            if interest < Decimal::ZERO {
                return reject(session, ctx, "Invalid amount. Enter monthly interest (or 0):");
            }
            let draft = PayableDraft {
                monthly_interest: interest,
                ..draft.clone()
            };
            accept(session, ctx, next(PayableStep::Fee, draft), "Interest", &money(interest))
        }

        PayableStep::Fee => {
            let fee = parse_amount(text);
            if fee < Decimal::ZERO {
                return reject(session, ctx, "Invalid amount. Enter processing fee (or 0):");
            }
            let terms = LoanTerms {
                account: draft.account.clone(),
                description: draft.description.clone(),
                proceeds: draft.proceeds,
                first_billing: draft.first_billing.clone(),
                term_count: draft.term_count,
                monthly_principal: draft.monthly_principal,
                monthly_interest: draft.monthly_interest,
                processing_fee: fee,
            };
            TransitionResult::new(Session::default()).with_effect(Effect::CreateLoan {
                terms,
                timestamp: ctx.timestamp.clone(),
            })
        }
    }
}

// ============================================================================
// Delete and edit
// ============================================================================

fn on_listing(purpose: ListingPurpose, rows: &[SheetRow], ctx: &ConvContext<'_>) -> TransitionResult {
    let listing = Listing::from_sheet(rows);
    if listing.is_empty() {
        return reset_with(prompts::empty_listing(purpose));
    }
    let state = match purpose {
        ListingPurpose::Delete => ConvState::Delete { listing },
        ListingPurpose::Edit => ConvState::Edit {
            listing,
            step: EditStep::Select,
        },
    };
    let prompt = prompts::canonical(&state, ctx);
    reply(Session::started(state), prompt)
}

fn delete(session: &Session, ctx: &ConvContext<'_>, listing: &Listing, text: &str) -> TransitionResult {
    let Some(row) = listing.select(text) else {
        return reject(session, ctx, "Invalid selection.");
    };
    let confirmation = prompts::row_deleted(row, ctx.locale);
    TransitionResult::new(Session::default()).with_effect(Effect::DeleteRow {
        row: row.clone(),
        confirmation,
    })
}

fn field_for_button(text: &str) -> Option<RowField> {
    Some(match text {
        keyboards::BTN_EDIT_DATE => RowField::Date,
        keyboards::BTN_EDIT_TYPE => RowField::Type,
        keyboards::BTN_EDIT_CATEGORY => RowField::Category,
        keyboards::BTN_EDIT_ACCOUNT1 => RowField::Account1,
        keyboards::BTN_EDIT_ACCOUNT2 => RowField::Account2,
        keyboards::BTN_EDIT_DESCRIPTION => RowField::Description,
        keyboards::BTN_EDIT_AMOUNT => RowField::Amount,
        _ => return None,
    })
}

fn edit(
    session: &Session,
    ctx: &ConvContext<'_>,
    listing: &Listing,
    step: &EditStep,
    text: &str,
) -> TransitionResult {
    let at = |step: EditStep| ConvState::Edit {
        listing: listing.clone(),
        step,
    };

    match step {
        EditStep::Select => match listing.select(text) {
            Some(row) => advance_to(session, ctx, at(EditStep::Field(row.clone()))),
            None => reject(session, ctx, "Invalid selection."),
        },

        EditStep::Field(row) => match field_for_button(text) {
            Some(field) => advance_to(session, ctx, at(EditStep::Input(row.clone(), field))),
            None => reject(session, ctx, "Invalid. Select from buttons:"),
        },

        EditStep::Input(row, field) => match edited_value(ctx, row, *field, text) {
            Ok(value) => {
                let confirmation =
                    prompts::cell_updated(*field, row.get(*field), &value, ctx.locale);
                TransitionResult::new(Session::default()).with_effect(Effect::UpdateCell {
                    row: row.clone(),
                    field: *field,
                    value,
                    confirmation,
                })
            }
            Err(error) => reject(session, ctx, error),
        },
    }
}

/// Validate and normalize a new cell value for `field` of `row`
fn edited_value(
    ctx: &ConvContext<'_>,
    row: &RowSnapshot,
    field: RowField,
    text: &str,
) -> Result<String, &'static str> {
    match field {
        RowField::Date if is_strict_date(text) => Ok(text.to_string()),
        RowField::Date => Err("Invalid format. Use MM/DD/YYYY"),

        RowField::Type => TransactionType::from_str(text)
            .map(|t| t.as_str().to_string())
            .map_err(|()| "Invalid type."),

        RowField::Category if ctx.catalog.is_any_category(text) => Ok(text.to_string()),
        RowField::Category => Err("Invalid category."),

        RowField::Account1 | RowField::Account2 if ctx.catalog.is_account(text) => {
            Ok(text.to_string())
        }
        RowField::Account1 | RowField::Account2 => Err("Invalid account."),

        RowField::Description if !text.is_empty() => Ok(text.to_string()),
        RowField::Description => Err("Description cannot be empty."),

        RowField::Amount => {
            let amount = parse_amount(text);
            if amount.is_zero() {
                return Err("Invalid amount.");
            }
            let amount = if row.get(RowField::Type) == TransactionType::Expense.as_str() {
                -amount.abs()
            } else {
                amount
            };
            Ok(amount.to_string())
        }
    }
}

// ============================================================================
// Summaries
// ============================================================================

fn summary(session: &Session, ctx: &ConvContext<'_>, step: SummaryStep, text: &str) -> TransitionResult {
    let at = |step: SummaryStep| ConvState::Summary { step };

    match step {
        SummaryStep::Kind => match text {
            keyboards::BTN_MONTHLY_SUMMARY => advance_to(session, ctx, at(SummaryStep::Year(SummaryKind::Monthly))),
            keyboards::BTN_YEARLY_SUMMARY => advance_to(session, ctx, at(SummaryStep::Year(SummaryKind::Yearly))),
            _ => reject(session, ctx, "Invalid. Select from buttons:"),
        },

        SummaryStep::Year(kind) => {
            let year = parse_year_button(text).filter(|y| selectable_years(ctx.today).contains(y));
            match (year, kind) {
                (None, _) => reject(session, ctx, "Invalid. Select from buttons:"),
                (Some(year), SummaryKind::Monthly) => advance_to(session, ctx, at(SummaryStep::Month(year))),
                (Some(year), SummaryKind::Yearly) => match year_range(year) {
                    Some((start, end)) => summarize(start, end, format!("Year {year}")),
                    None => reject(session, ctx, "Invalid. Select from buttons:"),
                },
            }
        }

        SummaryStep::Month(year) => {
            let range = parse_month_button(text)
                .and_then(|month| month_range(year, month).map(|range| (month, range)));
            match range {
                Some((month, (start, end))) => {
                    let name = MONTH_NAMES[month as usize - 1];
                    summarize(start, end, format!("{name} {year}"))
                }
                None => reject(session, ctx, "Invalid. Select from buttons:"),
            }
        }
    }
}

fn summarize(start: chrono::NaiveDate, end: chrono::NaiveDate, period: String) -> TransitionResult {
    TransitionResult::new(Session::default()).with_effect(Effect::Summarize { start, end, period })
}
