//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, Update, WebhookAck};
use super::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Telegram pushes updates here
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle one update to completion before acknowledging it.
///
/// Telegram does not deliver the next update until this one is answered, so
/// a user's messages reach the state machine in order. Bodies that do not
/// decode and delivery failures are logged and still acknowledged; a retry
/// would only fail again or replay the ledger write.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("Webhook secret mismatch");
            return Err(AppError::Unauthorized);
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Ignoring undecodable update");
            return Ok(Json(WebhookAck { ok: true }));
        }
    };

    let update_id = update.update_id;
    let Some(inbound) = update.into_inbound() else {
        tracing::debug!(update_id, "Ignoring update without text");
        return Ok(Json(WebhookAck { ok: true }));
    };

    let replies = state
        .runtime
        .handle_message(inbound.user_id, inbound.chat_id, &inbound.text)
        .await;

    for reply in &replies {
        if let Err(e) = state.transport.send(inbound.chat_id, reply).await {
            tracing::error!(update_id, chat_id = inbound.chat_id, error = %e, "Failed to send reply");
            break;
        }
    }

    Ok(Json(WebhookAck { ok: true }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.runtime.sessions().len().await,
    })
}

async fn get_version() -> &'static str {
    concat!("ledger-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Bad webhook secret"),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
