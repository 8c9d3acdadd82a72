use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::AudioBackendConfig;
use crate::session::SessionBackend;

/// Prefix for environment overrides, e.g. `FRONTDESK__LIVE__API_KEY`
pub const ENV_PREFIX: &str = "FRONTDESK";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveEndpointConfig,
    pub assistant: AssistantConfig,
    pub session: SessionSettings,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "frontdesk-voice".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Browser origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8088,
            allowed_origins: Vec::new(),
        }
    }
}

/// Streaming voice endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveEndpointConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub connect_timeout_ms: u64,
}

impl Default for LiveEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            api_key: None,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Assistant identities and the provisioning API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_base: String,
    pub assistant_id: Option<String>,
    pub demo_assistant_id: Option<String>,
    pub server_key: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.vapi.ai".to_string(),
            assistant_id: None,
            demo_assistant_id: None,
            server_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub backend: SessionBackend,
    /// Outbound audio frames buffered before new ones are dropped
    pub outbound_queue_depth: usize,
    /// Channel count of inbound PCM
    pub inbound_channels: u16,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Live,
            outbound_queue_depth: 32,
            inbound_channels: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub capture_buffer_size: usize,
    pub capture_queue_depth: usize,
    pub output_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let defaults = AudioBackendConfig::default();
        Self {
            capture_buffer_size: defaults.capture_buffer_size,
            capture_queue_depth: defaults.capture_queue_depth,
            output_sample_rate: defaults.output_sample_rate,
        }
    }
}

impl From<&AudioConfig> for AudioBackendConfig {
    fn from(audio: &AudioConfig) -> Self {
        Self {
            capture_buffer_size: audio.capture_buffer_size,
            capture_queue_depth: audio.capture_queue_depth,
            output_sample_rate: audio.output_sample_rate,
        }
    }
}

impl Config {
    /// Load from an optional file (extension resolved by `config`) plus environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("service.http.allowed_origins"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
