use serde::{Deserialize, Serialize};

use super::events::{InboundEvent, SessionTarget};
use crate::audio::pcm::WireFrame;
use crate::error::SessionError;
use crate::transcript::{Speaker, TranscriptFragment};

// ============================================================================
// Client → server
// ============================================================================

/// First message on a new connection
#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Setup {
    Assistant(AssistantSetup),
    Live(LiveSetup),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantSetup {
    pub assistant_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSetup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub input_audio_transcription: Empty,
    pub output_audio_transcription: Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl SetupMessage {
    pub fn for_target(target: &SessionTarget) -> Self {
        let setup = match target {
            SessionTarget::Assistant(id) => Setup::Assistant(AssistantSetup {
                assistant_id: id.as_str().to_string(),
            }),
            SessionTarget::Live(live) => Setup::Live(LiveSetup {
                model: live.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: live.voice_name.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: live.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: Empty::default(),
                output_audio_transcription: Empty::default(),
            }),
        };

        Self { setup }
    }
}

/// Microphone audio sent while the call is live
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<WireFrame>,
}

impl RealtimeInputMessage {
    pub fn audio(frame: WireFrame) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![frame],
            },
        }
    }
}

// ============================================================================
// Server → client
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub error: Option<ServerError>,
    pub go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: Option<WireFrame>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl ServerMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, SessionError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Translate into typed events, in the order the session must apply them
    pub fn into_events(self) -> Vec<InboundEvent> {
        let mut events = Vec::new();

        if let Some(error) = self.error {
            let detail = match error.code {
                Some(code) => format!("remote error {}: {}", code, error.message),
                None => format!("remote error: {}", error.message),
            };
            events.push(InboundEvent::Error(SessionError::Connection(detail)));
        }

        if let Some(content) = self.server_content {
            if let Some(turn) = content.model_turn {
                events.extend(
                    turn.parts
                        .into_iter()
                        .filter_map(|part| part.inline_data)
                        .filter(|frame| !frame.data.is_empty())
                        .map(InboundEvent::AudioChunk),
                );
            }

            if let Some(input) = content.input_transcription {
                if !input.text.is_empty() {
                    events.push(InboundEvent::Transcript(TranscriptFragment::new(
                        input.text,
                        Speaker::User,
                    )));
                }
            }

            if let Some(output) = content.output_transcription {
                if !output.text.is_empty() {
                    events.push(InboundEvent::Transcript(TranscriptFragment::new(
                        output.text,
                        Speaker::Agent,
                    )));
                }
            }

            if content.turn_complete {
                events.push(InboundEvent::TurnComplete);
            }

            if content.interrupted {
                events.push(InboundEvent::Interrupted);
            }
        }

        if self.go_away.is_some() {
            events.push(InboundEvent::Closed {
                reason: Some("server is going away".to_string()),
            });
        }

        events
    }
}

/// Parse a raw payload, turning malformed input into a transient error event
pub fn parse_events(payload: &[u8]) -> Vec<InboundEvent> {
    match ServerMessage::parse(payload) {
        Ok(message) => message.into_events(),
        Err(e) => vec![InboundEvent::Error(e)],
    }
}
