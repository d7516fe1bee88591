//! HTTP surface: the Telegram webhook plus health endpoints

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionRuntime;
use crate::telegram::Transport;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    pub transport: Arc<dyn Transport>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`, if one was configured
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(
        runtime: ProductionRuntime,
        transport: Arc<dyn Transport>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            runtime: Arc::new(runtime),
            transport,
            webhook_secret,
        }
    }
}
