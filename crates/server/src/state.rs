//! Application state shared across all handlers

use parking_lot::RwLock;
use std::sync::Arc;

use bima_config::Settings;

use crate::session::SessionRegistry;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration (RwLock so an admin reload can swap it)
    pub config: Arc<RwLock<Settings>>,
    /// Live call sessions
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        let capacity = config.server.max_sessions;
        Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::new(SessionRegistry::new(capacity)),
        }
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> Settings {
        self.config.read().clone()
    }
}
