//! Outbound Telegram Bot API client

use crate::config::TelegramConfig;
use crate::keyboards::Keyboard;
use crate::state_machine::Reply;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Telegram rejected the message ({status}): {description}")]
    Rejected { status: u16, description: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Network(e.to_string())
    }
}

/// Delivers replies to a chat
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TransportError>;
}

#[derive(Debug, Serialize, PartialEq)]
struct ReplyKeyboardMarkup<'a> {
    keyboard: &'a [Vec<String>],
    resize_keyboard: bool,
    one_time_keyboard: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup<'a>>,
}

impl<'a> SendMessage<'a> {
    fn new(chat_id: i64, reply: &'a Reply) -> Self {
        Self {
            chat_id,
            text: &reply.text,
            parse_mode: "HTML",
            reply_markup: markup(&reply.keyboard),
        }
    }
}

fn markup(keyboard: &Keyboard) -> Option<ReplyKeyboardMarkup<'_>> {
    if keyboard.is_empty() {
        return None;
    }
    Some(ReplyKeyboardMarkup {
        keyboard: &keyboard.rows,
        resize_keyboard: true,
        one_time_keyboard: keyboard.one_time,
    })
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    send_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            send_url: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&SendMessage::new(chat_id, reply))
            .send()
            .await?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();
        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            body => Err(TransportError::Rejected {
                status: status.as_u16(),
                description: body
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}
