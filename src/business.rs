//! Business configuration and the persona derived from it
//!
//! The dashboard hands us a `BusinessConfig`. Everything the remote side needs
//! (system prompt, voice, model settings, greeting) is derived here and never
//! written back.

use serde::{Deserialize, Serialize};

/// Default neutral voice used when the configured one is not recognized
pub const DEFAULT_VOICE: Voice = Voice::Kore;

/// Business profile supplied by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessConfig {
    pub name: String,
    pub industry: String,
    pub tone: Tone,
    pub voice: Voice,
    pub instructions: String,
}

/// Conversational tone of the receptionist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Friendly,
    Enthusiastic,
    #[serde(other)]
    Unrecognized,
}

/// Prebuilt voice selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Zephyr,
    Puck,
    Charon,
    Kore,
    Fenrir,
    #[serde(other)]
    Unrecognized,
}

/// Model settings for a tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSettings {
    pub model: &'static str,
    pub temperature: f32,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional | Tone::Unrecognized => "professional",
            Tone::Friendly => "friendly",
            Tone::Enthusiastic => "enthusiastic",
        }
    }

    /// Unrecognized tones fall back to the professional settings
    pub fn settings(&self) -> ToneSettings {
        let temperature = match self {
            Tone::Professional | Tone::Unrecognized => 0.7,
            Tone::Friendly => 0.8,
            Tone::Enthusiastic => 0.9,
        };

        ToneSettings {
            model: "gpt-4o-mini",
            temperature,
        }
    }
}

impl Voice {
    fn resolved(self) -> Voice {
        match self {
            Voice::Unrecognized => DEFAULT_VOICE,
            other => other,
        }
    }

    /// Prebuilt voice name understood by the live endpoint
    pub fn prebuilt_name(&self) -> &'static str {
        match self.resolved() {
            Voice::Zephyr => "Zephyr",
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            _ => "Kore",
        }
    }

    /// Voice-provider identifier used when provisioning an assistant
    pub fn provider_voice_id(&self) -> &'static str {
        match self.resolved() {
            Voice::Zephyr => "pNInz6obpgDQGcFmaJgB",
            Voice::Puck => "EXAVITQu4vr4xnSDxMaL",
            Voice::Charon => "ErXwobaYiN019PkySvjV",
            Voice::Fenrir => "VR6AewLTigWG4xSOukaG",
            _ => "MF3mGyEYCl7XYWbV9V6O",
        }
    }
}

impl BusinessConfig {
    /// Instructions followed by the tone and business-name directive
    pub fn system_prompt(&self) -> String {
        format!(
            "{}\n\nAlways respond in a {} tone. Your business name is {}.",
            self.instructions,
            self.tone.as_str(),
            self.name
        )
    }

    pub fn assistant_name(&self) -> String {
        format!("{} - {}", self.name, self.industry)
    }

    pub fn first_message(&self) -> String {
        format!("Hello! This is {}. How can I help you today?", self.name)
    }
}
