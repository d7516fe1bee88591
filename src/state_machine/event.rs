//! Events that drive the conversation

use crate::ledger::{PersistenceError, SheetRow};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Text or button press from the user
    UserMessage { text: String },

    /// Full sheet read for a delete or edit listing, header included
    ListingLoaded { rows: Vec<SheetRow> },

    /// The listing read failed
    ListingFailed { error: PersistenceError },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }
}
