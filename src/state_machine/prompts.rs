//! Reply texts and keyboards
//!
//! Every state a user can sit in has exactly one canonical prompt, used both
//! when the state is entered and when back navigation returns to it.

use super::effect::Reply;
use super::state::{
    ConvContext, ConvState, EditStep, EntryKind, EntryStep, Listing, ListingPurpose,
    PayableStep, ReceivableKind, ReceivableStep, SummaryKind, SummaryStep,
};
use crate::catalog::{CategoryFamily, TransactionType};
use crate::format::{escape_html, format_date, Locale};
use crate::keyboards;
use crate::ledger::loan::LoanTerms;
use crate::ledger::summary::Summary;
use crate::ledger::{LedgerRow, PersistenceError, PersistenceErrorKind, RowField, RowSnapshot, SheetRow};
use crate::validation::{parse_amount, selectable_years};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt::Write;

pub const WELCOME: &str = "👋 Welcome to your Personal Finance Tracker!\n\nChoose an option:";
pub const CANCELLED: &str = "✅ Cancelled.";
pub const MAIN_MENU: &str = "🏠 Main menu:";
pub const USE_MENU: &str = "Use menu buttons:";

pub fn main_menu(text: &str) -> Reply {
    Reply::new(text, keyboards::main_menu())
}

/// Heading shown when a flow is started from the menu
pub fn flow_heading(state: &ConvState) -> Option<&'static str> {
    match state {
        ConvState::Entry { draft, .. } => Some(match draft.kind {
            EntryKind::Expense => "💸 <b>Adding Expense</b>",
            EntryKind::Income => "💰 <b>Adding Income</b>",
            EntryKind::Transfer => "🔄 <b>Adding Transfer</b>",
            EntryKind::Reimbursement => "💳 <b>Adding Reimbursement</b>",
        }),
        ConvState::Receivable { .. } => Some("🤝 <b>Add Receivable</b>"),
        ConvState::Payable { .. } => Some("💵 <b>Add Payable - Loan Proceeds</b>"),
        _ => None,
    }
}

/// The prompt for `state` with nothing in front of it
#[allow(clippy::too_many_lines)]
pub fn canonical(state: &ConvState, ctx: &ConvContext<'_>) -> Reply {
    let catalog = ctx.catalog;
    match state {
        ConvState::Idle | ConvState::Loading { .. } => main_menu(MAIN_MENU),

        ConvState::Entry { step, draft } => match step {
            EntryStep::Category => Reply::new(
                "Select category:",
                keyboards::categories(
                    catalog,
                    draft.kind.family().unwrap_or(CategoryFamily::Expense),
                ),
            ),
            EntryStep::Account1 if draft.kind.has_destination() => Reply::new(
                "Select source (Account #1):",
                keyboards::accounts(catalog),
            ),
            EntryStep::Account1 => Reply::new("Select account:", keyboards::accounts(catalog)),
            EntryStep::Account2 => {
                Reply::new("Select destination:", keyboards::accounts(catalog))
            }
            EntryStep::Description => description_prompt(),
            EntryStep::Amount => amount_prompt(),
        },

        ConvState::Receivable { step, draft } => match step {
            ReceivableStep::Kind => {
                Reply::new("Is this new or payment?", keyboards::receivable_kind())
            }
            ReceivableStep::Account => Reply::new(
                match draft.kind {
                    ReceivableKind::New => "🤝 <b>New Receivable</b>\n\nSelect account (Account #1):",
                    ReceivableKind::Payment => {
                        "💰 <b>Payment Received</b>\n\nSelect account (Account #2):"
                    }
                },
                keyboards::accounts(catalog),
            ),
            ReceivableStep::Description => description_prompt(),
            ReceivableStep::Amount => amount_prompt(),
        },

        ConvState::Payable { step, .. } => match step {
            PayableStep::Description => Reply::new(
                "📝 Enter loan description:",
                keyboards::back_to_menu_only(),
            ),
            PayableStep::Proceeds => {
                Reply::new("💵 Enter loan proceeds amount:", keyboards::back_only())
            }
            PayableStep::Account => Reply::new(
                "💳 Select the account for monthly payments (Account #1):",
                keyboards::accounts(catalog),
            ),
            PayableStep::BillingDate => Reply::new(
                "📅 Enter first billing date (MM/DD/YYYY):\n\nExample: 12/15/2024",
                keyboards::back_only(),
            ),
            PayableStep::Terms => Reply::new(
                "📊 Enter loan terms (number of months):\n\nExample: 12",
                keyboards::back_only(),
            ),
            PayableStep::Principal => {
                Reply::new("💰 Enter monthly principal payment:", keyboards::back_only())
            }
            PayableStep::Interest => Reply::new(
                "💸 Enter monthly interest payment (or 0):",
                keyboards::back_only(),
            ),
            PayableStep::Fee => Reply::new(
                "💳 Enter processing fee (or 0 if none):",
                keyboards::back_only(),
            ),
        },

        ConvState::Delete { listing } => listing_prompt(ListingPurpose::Delete, listing, ctx.locale),

        ConvState::Edit { listing, step } => match step {
            EditStep::Select => listing_prompt(ListingPurpose::Edit, listing, ctx.locale),
            EditStep::Field(row) => Reply::new(
                format!(
                    "📝 <b>Edit Transaction</b>\n\n{}\nSelect field to edit:",
                    row_details(row, ctx.locale)
                ),
                keyboards::edit_fields(),
            ),
            EditStep::Input(row, field) => edit_input_prompt(row, *field, ctx),
        },

        ConvState::Summary { step } => match step {
            SummaryStep::Kind => Reply::new(
                "📊 <b>Financial Summary</b>\n\nChoose type:",
                keyboards::summary_kind(),
            ),
            SummaryStep::Year(kind) => Reply::new(
                match kind {
                    SummaryKind::Monthly => "📅 <b>Monthly Summary</b>\n\nSelect year:",
                    SummaryKind::Yearly => "📆 <b>Yearly Summary</b>\n\nSelect year:",
                },
                keyboards::years(&selectable_years(ctx.today)),
            ),
            SummaryStep::Month(year) => Reply::new(
                format!("📅 <b>Monthly Summary - {year}</b>\n\nSelect month:"),
                keyboards::months(),
            ),
        },
    }
}

fn description_prompt() -> Reply {
    Reply::new("📝 Enter description:", keyboards::back_only())
}

fn amount_prompt() -> Reply {
    Reply::new("💵 Enter amount:", keyboards::back_only())
}

fn edit_input_prompt(row: &RowSnapshot, field: RowField, ctx: &ConvContext<'_>) -> Reply {
    let current = |f: RowField| escape_html(or_none(row.get(f)));
    match field {
        RowField::Date => Reply::new(
            format!(
                "📅 <b>Edit Date</b>\n\nCurrent: {}\n\nEnter new date (MM/DD/YYYY):",
                current(field)
            ),
            keyboards::back_only(),
        ),
        RowField::Type => Reply::new(
            format!("📊 <b>Edit Type</b>\n\nCurrent: {}\n\nSelect new type:", current(field)),
            keyboards::transaction_types(),
        ),
        RowField::Category => Reply::new(
            format!(
                "📁 <b>Edit Category</b>\n\nCurrent: {}\n\nSelect new category:",
                current(field)
            ),
            keyboards::categories(ctx.catalog, CategoryFamily::for_type(row.get(RowField::Type))),
        ),
        RowField::Account1 | RowField::Account2 => Reply::new(
            format!(
                "💳 <b>Edit {}</b>\n\nCurrent: {}\n\nSelect new account:",
                field.label(),
                current(field)
            ),
            keyboards::accounts(ctx.catalog),
        ),
        RowField::Description => Reply::new(
            format!(
                "📝 <b>Edit Description</b>\n\nCurrent: {}\n\nEnter new description:",
                current(field)
            ),
            keyboards::back_only(),
        ),
        RowField::Amount => Reply::new(
            format!(
                "💰 <b>Edit Amount</b>\n\nCurrent: {}\n\nEnter new amount:",
                ctx.locale.currency(parse_amount(row.get(field)))
            ),
            keyboards::back_only(),
        ),
    }
}

/// Canonical prompt with an error line in front
pub fn reprompt(error: &str, state: &ConvState, ctx: &ConvContext<'_>) -> Reply {
    let prompt = canonical(state, ctx);
    Reply::new(format!("❌ {error}\n\n{}", prompt.text), prompt.keyboard)
}

/// Acknowledge an accepted value, then prompt for the next step
pub fn acknowledged(label: &str, value: &str, next: &ConvState, ctx: &ConvContext<'_>) -> Reply {
    let prompt = canonical(next, ctx);
    Reply::new(
        format!("✅ {label}: <b>{value}</b>\n\n{}", prompt.text),
        prompt.keyboard,
    )
}

/// First prompt of a flow started from the menu
pub fn started(state: &ConvState, ctx: &ConvContext<'_>) -> Reply {
    let prompt = canonical(state, ctx);
    match flow_heading(state) {
        Some(heading) => Reply::new(format!("{heading}\n\n{}", prompt.text), prompt.keyboard),
        None => prompt,
    }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "None"
    } else {
        value
    }
}

// ============================================================================
// Listings and row details
// ============================================================================

fn listing_prompt(purpose: ListingPurpose, listing: &Listing, locale: &Locale) -> Reply {
    let mut text = match purpose {
        ListingPurpose::Delete => "🗑️ <b>Delete Transaction</b>\n\nSelect number to delete:\n\n",
        ListingPurpose::Edit => "📝 <b>Edit Transaction</b>\n\nSelect transaction:\n\n",
    }
    .to_string();

    for (i, row) in listing.rows.iter().enumerate() {
        let _ = write!(
            text,
            "<b>{}.</b> {} - {}\n   📅 {}\n   📝 {}\n\n",
            i + 1,
            escape_html(row.get(RowField::Type)),
            locale.currency(parse_amount(row.get(RowField::Amount))),
            escape_html(row.get(RowField::Date)),
            escape_html(row.get(RowField::Description)),
        );
    }

    Reply::new(text, keyboards::row_numbers(listing.len()))
}

pub fn empty_listing(purpose: ListingPurpose) -> Reply {
    main_menu(match purpose {
        ListingPurpose::Delete => "📊 No transactions to delete.",
        ListingPurpose::Edit => "📊 No transactions to edit.",
    })
}

fn row_details(row: &RowSnapshot, locale: &Locale) -> String {
    let field = |f: RowField| escape_html(or_none(row.get(f)));
    format!(
        "📅 Date: {}\n📊 Type: {}\n📁 Category: {}\n💳 Account 1: {}\n💳 Account 2: {}\n📝 Description: {}\n💰 Amount: {}\n",
        escape_html(row.get(RowField::Date)),
        escape_html(row.get(RowField::Type)),
        field(RowField::Category),
        field(RowField::Account1),
        field(RowField::Account2),
        escape_html(row.get(RowField::Description)),
        locale.currency(parse_amount(row.get(RowField::Amount))),
    )
}

// ============================================================================
// Confirmations
// ============================================================================

pub fn entry_saved(row: &LedgerRow, locale: &Locale) -> String {
    let mut text = format!(
        "✅ <b>Saved!</b>\n\n📊 Type: {}\n📁 Category: {}\n💳 Account: {}",
        row.tx_type,
        escape_html(if row.category.is_empty() { "N/A" } else { &row.category }),
        escape_html(&row.account1),
    );
    if !row.account2.is_empty() {
        let _ = write!(text, " → {}", escape_html(&row.account2));
    }
    let _ = write!(
        text,
        "\n📝 Description: {}\n💰 Amount: {}\n",
        escape_html(&row.description),
        locale.currency(row.amount)
    );
    text
}

pub fn receivable_saved(kind: ReceivableKind, row: &LedgerRow, locale: &Locale) -> String {
    let title = match kind {
        ReceivableKind::New => "New Receivable",
        ReceivableKind::Payment => "Payment Received",
    };
    format!(
        "✅ <b>{title} Saved!</b>\n\n📊 Type: {}\n💳 {} → {}\n📝 Description: {}\n💰 Amount: {}\n",
        TransactionType::Transfer,
        escape_html(&row.account1),
        escape_html(&row.account2),
        escape_html(&row.description),
        locale.currency(row.amount)
    )
}

pub fn loan_created(terms: &LoanTerms, loan_number: u32, row_count: usize, locale: &Locale) -> String {
    let mut text = format!(
        "✅ <b>Loan Created Successfully!</b>\n\n📋 Loan #{loan_number} for {}\n💰 Proceeds: {}\n📅 First billing: {}\n📊 Terms: {} months\n💵 Monthly principal: {}\n💸 Monthly interest: {}\n",
        escape_html(&terms.account),
        locale.currency(terms.proceeds),
        escape_html(&terms.first_billing),
        terms.term_count,
        locale.currency(terms.monthly_principal),
        locale.currency(terms.monthly_interest),
    );
    if terms.processing_fee > Decimal::ZERO {
        let _ = writeln!(text, "💳 Processing fee: {}", locale.currency(terms.processing_fee));
    }
    let _ = write!(text, "\n📝 Total transactions created: {row_count}");
    text
}

pub fn row_deleted(row: &RowSnapshot, locale: &Locale) -> String {
    format!(
        "✅ <b>Transaction Deleted!</b>\n\n📊 Type: {}\n📅 Date: {}\n📝 Description: {}\n💰 Amount: {}\n",
        escape_html(row.get(RowField::Type)),
        escape_html(row.get(RowField::Date)),
        escape_html(row.get(RowField::Description)),
        locale.currency(parse_amount(row.get(RowField::Amount))),
    )
}

pub fn cell_updated(field: RowField, old: &str, new: &str, locale: &Locale) -> String {
    let (old, new) = if field == RowField::Amount {
        (
            locale.currency(parse_amount(old)),
            locale.currency(parse_amount(new)),
        )
    } else {
        (escape_html(old), escape_html(new))
    };
    format!(
        "✅ <b>{} Updated!</b>\n\nOld: {old}\nNew: {new}",
        field.label()
    )
}

// ============================================================================
// Reports
// ============================================================================

pub fn summary_report(
    period: &str,
    start: NaiveDate,
    end: NaiveDate,
    summary: &Summary,
    locale: &Locale,
) -> String {
    let range = format!("📅 {} - {}", format_date(start), format_date(end));
    if summary.transaction_count == 0 {
        return format!("📊 <b>{period} Summary</b>\n\nNo transactions.\n\n{range}");
    }

    let mut text = format!(
        "📊 <b>{period} Summary</b>\n\n{range}\n📝 Transactions: {}\n\n💰 <b>INCOME</b>\nTotal: {}\n",
        summary.transaction_count,
        locale.currency(summary.total_income),
    );
    if !summary.income_by_category.is_empty() {
        text.push_str("\nBreakdown:\n");
        for (category, amount) in &summary.income_by_category {
            let _ = writeln!(text, "  • {}: {}", escape_html(category), locale.currency(*amount));
        }
    }

    let _ = write!(
        text,
        "\n💸 <b>EXPENSES</b>\nTotal: {}\n",
        locale.currency(summary.total_expense)
    );
    if !summary.expense_by_category.is_empty() {
        text.push_str("\nBreakdown:\n");
        for (category, amount) in &summary.expense_by_category {
            let _ = writeln!(text, "  • {}: {}", escape_html(category), locale.currency(*amount));
        }
    }

    let net = summary.net_income;
    let sign = if net < Decimal::ZERO { "-" } else { "" };
    let _ = write!(
        text,
        "\n━━━━━━━━━━━━━━━━━\n📈 <b>NET INCOME</b>\n{sign}{}\n",
        locale.currency(net)
    );
    text.push_str(match net.cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Greater => "\n✅ You saved money!",
        std::cmp::Ordering::Less => "\n⚠️ You spent more than earned.",
        std::cmp::Ordering::Equal => "\n➖ Break even.",
    });
    text
}

pub fn recent(rows: &[SheetRow], locale: &Locale) -> String {
    if rows.is_empty() {
        return "📊 No transactions yet.".to_string();
    }
    let cell = |row: &SheetRow, f: RowField| escape_html(row.get(f.index()).map_or("", String::as_str));

    let mut text = "📊 <b>Recent Transactions:</b>\n\n".to_string();
    for row in rows {
        let account2 = cell(row, RowField::Account2);
        let _ = write!(
            text,
            "<b>{}</b> - {}\n📅 {}\n📁 {}\n💳 {}{}\n📝 {}\n\n",
            cell(row, RowField::Type),
            locale.currency(parse_amount(row.get(RowField::Amount.index()).map_or("", String::as_str))),
            cell(row, RowField::Date),
            cell(row, RowField::Category),
            cell(row, RowField::Account1),
            if account2.is_empty() { String::new() } else { format!(" → {account2}") },
            cell(row, RowField::Description),
        );
    }
    text
}

// ============================================================================
// Failures
// ============================================================================

/// What the user was doing when the store failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    CreateLoan,
    Delete,
    Update,
    Load,
    Summarize,
    ShowRecent,
}

pub fn failure(operation: Operation, error: &PersistenceError) -> Reply {
    if error.kind == PersistenceErrorKind::StaleSelection {
        return main_menu(
            "⚠️ The transaction list changed since it was shown. Nothing was changed, please select again.",
        );
    }
    let text = match operation {
        Operation::Save => "❌ Error saving. Try again.",
        Operation::CreateLoan => "❌ Error creating loan. Please try again.",
        Operation::Delete => "❌ Error deleting.",
        Operation::Update => "❌ Error updating.",
        Operation::Load => "❌ Error loading transactions.",
        Operation::Summarize => "❌ Error generating summary.",
        Operation::ShowRecent => "❌ Error loading recent transactions.",
    };
    if error.kind == PersistenceErrorKind::Timeout {
        main_menu(&format!("{text}\n\n⏱️ The spreadsheet did not respond in time."))
    } else {
        main_menu(text)
    }
}
