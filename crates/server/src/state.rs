//! Shared application state

use std::sync::Arc;
use voice_gateway_config::Settings;
use voice_gateway_telephony::CallManager;

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub manager: Arc<CallManager>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, manager: Arc<CallManager>) -> Self {
        Self { settings, manager }
    }
}
