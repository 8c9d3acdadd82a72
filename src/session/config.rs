use serde::{Deserialize, Serialize};

use crate::audio::AudioBackendConfig;
use crate::config::Config;

/// Which kind of remote session a call opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Persona sent inline with the setup message
    Live,
    /// Persona referenced through a provisioned assistant id
    Assistant,
}

/// Per-bridge session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,

    /// Model requested by the live backend
    pub live_model: String,

    /// Required by the live backend; checked when a call starts
    pub live_api_key: Option<String>,

    /// Channel count of inbound PCM
    pub inbound_channels: u16,

    pub audio: AudioBackendConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Live,
            live_model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            live_api_key: None,
            inbound_channels: 1,
            audio: AudioBackendConfig::default(),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            backend: cfg.session.backend,
            live_model: cfg.live.model.clone(),
            live_api_key: cfg.live.api_key.clone().filter(|key| !key.trim().is_empty()),
            inbound_channels: cfg.session.inbound_channels.max(1),
            audio: AudioBackendConfig::from(&cfg.audio),
        }
    }
}
