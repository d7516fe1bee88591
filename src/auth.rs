//! Sender authorization

use std::collections::HashSet;

pub const UNAUTHORIZED_MESSAGE: &str =
    "🚫 Unauthorized access. This bot is private and only accessible to authorized users.";

/// Decides whether a chat user may talk to the bot at all
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, user_id: i64) -> bool;
}

/// Fixed set of permitted user ids
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    users: HashSet<i64>,
}

impl AllowList {
    pub fn new(users: impl IntoIterator<Item = i64>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    /// Union of `AUTHORIZED_USER_ID` and the comma separated
    /// `AUTHORIZED_USER_IDS`
    pub fn from_env() -> Self {
        let single = std::env::var("AUTHORIZED_USER_ID").ok();
        let many = std::env::var("AUTHORIZED_USER_IDS").ok();
        Self::parse(single.as_deref(), many.as_deref())
    }

    fn parse(single: Option<&str>, many: Option<&str>) -> Self {
        let ids = single
            .into_iter()
            .chain(many.into_iter().flat_map(|list| list.split(',')))
            .filter_map(|id| {
                let id = id.trim();
                let parsed = id.parse::<i64>().ok();
                if parsed.is_none() && !id.is_empty() {
                    tracing::warn!(id, "Ignoring malformed authorized user id");
                }
                parsed
            });
        Self::new(ids)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

impl Authorizer for AllowList {
    fn is_authorized(&self, user_id: i64) -> bool {
        self.users.contains(&user_id)
    }
}
