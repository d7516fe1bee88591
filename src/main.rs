//! Ledger Bot - a Telegram front end for a spreadsheet ledger
//!
//! Each chat message drives a per-user conversation state machine whose
//! effects append, edit, delete and summarize rows in a Google Sheet.

mod api;
mod auth;
mod catalog;
mod config;
mod format;
mod keyboards;
mod ledger;
mod runtime;
mod state_machine;
mod telegram;
mod validation;

use api::{create_router, AppState};
use auth::AllowList;
use config::{BotConfig, SheetsAuth};
use ledger::sheets::{GoogleSheetsGateway, ServiceAccount, TokenSource};
use ledger::{LedgerGateway, LoggingGateway};
use runtime::{BotRuntime, LoanSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::{TelegramClient, Transport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    let tokens = match &config.sheets_auth {
        SheetsAuth::ServiceAccount {
            email,
            private_key,
            token_url,
        } => TokenSource::service_account(ServiceAccount::new(
            email.as_str(),
            private_key,
            token_url.as_str(),
        )?),
        SheetsAuth::Static(token) => TokenSource::Static(token.clone()),
        SheetsAuth::Metadata(url) => TokenSource::metadata(url.as_str()),
    };
    let sheets = GoogleSheetsGateway::new(config.sheets.clone(), tokens)?;
    let gateway: Arc<dyn LedgerGateway> = Arc::new(LoggingGateway::new(
        Arc::new(sheets),
        config.request_timeout(),
    ));
    tracing::info!(
        spreadsheet = %config.sheets.spreadsheet_id,
        tab = %config.sheets.tab,
        "Ledger gateway ready"
    );

    let allow_list = AllowList::from_env();
    if allow_list.is_empty() {
        tracing::warn!("No authorized users configured. Set AUTHORIZED_USER_ID or AUTHORIZED_USER_IDS.");
    } else {
        tracing::info!(users = allow_list.len(), "Allow list loaded");
    }

    let runtime = BotRuntime::new(
        gateway,
        Arc::new(allow_list),
        config.catalog.clone(),
        config.locale.clone(),
        LoanSettings {
            offsets: config.loan_offsets.clone(),
            disbursement_account: config.disbursement_account.clone(),
        },
    );
    let transport: Arc<dyn Transport> = Arc::new(TelegramClient::new(&config.telegram)?);

    if config.telegram.webhook_secret.is_none() {
        tracing::warn!("Webhook secret not set; any caller can post updates");
    }
    let state = AppState::new(runtime, transport, config.telegram.webhook_secret.clone());
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Ledger bot listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
