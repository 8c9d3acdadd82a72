use crate::session::{SessionBridge, SessionHandle};
use crate::transcript::Speaker;
use crate::transport::SessionListener;
use crate::error::SessionError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<SessionBridge>,

    /// Calls that are starting or live (call_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl AppState {
    pub fn new(bridge: Arc<SessionBridge>) -> Self {
        Self {
            bridge,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Listener for calls started over HTTP: everything goes to the log
pub struct LogListener {
    call_id: String,
}

impl LogListener {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
        }
    }
}

impl SessionListener for LogListener {
    fn on_transcript(&self, text: &str, speaker: Speaker) {
        info!("[{}] {:?}: {}", self.call_id, speaker, text);
    }

    fn on_interrupted(&self) {
        info!("[{}] agent interrupted", self.call_id);
    }

    fn on_error(&self, error: &SessionError) {
        warn!("[{}] {}", self.call_id, error);
    }

    fn on_call_start(&self) {
        info!("[{}] call started", self.call_id);
    }

    fn on_call_end(&self) {
        info!("[{}] call ended", self.call_id);
    }
}
