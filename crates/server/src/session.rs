//! Session registry
//!
//! Holds the live call sessions for this process, keyed by generated id.
//! Sessions are in-memory only; they do not survive a restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use bima_agent::{CallConfig, CallSession};
use bima_config::Settings;
use bima_core::Language;
use bima_llm::{ChatBackendConfig, HttpChatBackend};
use bima_pipeline::{
    CaptureDevice, ChannelDevice, HttpTranscriber, PacedSynthesizer, TranscriberConfig,
};

use crate::ServerError;

/// One registered call session and its audio inlet
pub struct SessionEntry {
    pub session: CallSession,
    /// Device the WebSocket feeds captured audio into
    pub device: Arc<ChannelDevice>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEntry")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Registry of live sessions with a capacity cap
pub struct SessionRegistry {
    entries: DashMap<String, Arc<SessionEntry>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Create a session with collaborators wired from settings
    pub fn create(
        &self,
        settings: &Settings,
        language: Option<Language>,
    ) -> Result<Arc<SessionEntry>, ServerError> {
        if self.entries.len() >= self.capacity {
            return Err(ServerError::Capacity(self.capacity));
        }

        let id = uuid::Uuid::new_v4().to_string();

        let chat = HttpChatBackend::new(ChatBackendConfig::from(&settings.chat))
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        let transcriber = HttpTranscriber::new(TranscriberConfig::from(&settings.transcription))
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        let synthesizer = PacedSynthesizer::new(settings.call.speaking_rate_wpm);
        let device = ChannelDevice::new();

        let session = CallSession::new(
            id.clone(),
            CallConfig::from_settings(settings, language),
            Arc::new(chat),
            Arc::new(transcriber),
            Arc::new(synthesizer),
            device.clone() as Arc<dyn CaptureDevice>,
        );

        let entry = Arc::new(SessionEntry {
            session,
            device,
            created_at: Utc::now(),
        });
        self.entries.insert(id.clone(), Arc::clone(&entry));

        tracing::info!(session = %id, total = self.entries.len(), "session created");
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Remove a session, ending any active call
    pub fn remove(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, entry)) => {
                entry.session.end_call();
                tracing::info!(session = %id, "session removed");
                true
            },
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
