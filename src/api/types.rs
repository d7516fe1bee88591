//! Telegram update payloads and endpoint responses

use serde::{Deserialize, Serialize};

/// The subset of a Telegram `Update` the bot acts on
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A text message ready for the runtime
#[derive(Debug, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: i64,
    pub chat_id: i64,
    pub text: String,
}

impl Update {
    /// Only text messages with a known sender are handled
    pub fn into_inbound(self) -> Option<Inbound> {
        let message = self.message?;
        Some(Inbound {
            user_id: message.from?.id,
            chat_id: message.chat.id,
            text: message.text?,
        })
    }
}

/// Body returned to Telegram for every accepted update
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_becomes_inbound() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 3,
                "date": 1_700_000_000,
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "chat": {"id": 99, "type": "private"},
                "text": "💸 Add Expense"
            }
        }))
        .unwrap();

        assert_eq!(
            update.into_inbound(),
            Some(Inbound {
                user_id: 42,
                chat_id: 99,
                text: "💸 Add Expense".to_string(),
            })
        );
    }

    #[test]
    fn non_text_updates_are_skipped() {
        let sticker: Update = serde_json::from_value(json!({
            "update_id": 11,
            "message": {"from": {"id": 42}, "chat": {"id": 99}, "sticker": {}}
        }))
        .unwrap();
        assert!(sticker.into_inbound().is_none());

        let edited: Update = serde_json::from_value(json!({
            "update_id": 12,
            "edited_message": {"from": {"id": 42}, "chat": {"id": 99}, "text": "x"}
        }))
        .unwrap();
        assert!(edited.into_inbound().is_none());
    }
}
