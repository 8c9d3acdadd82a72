use serde::{Deserialize, Serialize};

use crate::audio::pcm::WireFrame;
use crate::error::SessionError;
use crate::transcript::{Speaker, TranscriptFragment};

/// Opaque identifier of a provisioned remote assistant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssistantId(String);

impl AssistantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssistantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persona carried inline when no assistant identity is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    pub model: String,
    pub system_instruction: String,
    pub voice_name: String,
}

/// What a new connection should talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    Assistant(AssistantId),
    Live(LiveConfig),
}

impl SessionTarget {
    pub fn describe(&self) -> String {
        match self {
            SessionTarget::Assistant(id) => format!("assistant {}", id),
            SessionTarget::Live(live) => format!("live model {} ({})", live.model, live.voice_name),
        }
    }
}

/// Everything the remote endpoint can tell a session
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    AudioChunk(WireFrame),
    Transcript(TranscriptFragment),
    TurnComplete,
    Interrupted,
    Error(SessionError),
    Closed { reason: Option<String> },
}

/// Callbacks delivered by a session
///
/// Events are delivered one at a time, in arrival order, from the session's
/// inbound task. Implementations should return quickly.
#[allow(unused_variables)]
pub trait SessionListener: Send + Sync {
    /// Transport is connected and set up
    fn on_open(&self) {}

    /// A chunk of agent audio arrived (it is scheduled for playback separately)
    fn on_audio_chunk(&self, frame: &WireFrame) {}

    fn on_transcript(&self, text: &str, speaker: Speaker) {}

    fn on_turn_complete(&self) {}

    /// The user talked over the agent; playback was cut
    fn on_interrupted(&self) {}

    fn on_error(&self, error: &SessionError) {}

    /// Transport closed
    fn on_close(&self) {}

    /// Call is live: audio is flowing both ways
    fn on_call_start(&self) {}

    /// Call is over and all resources are released
    fn on_call_end(&self) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SessionListener for NoopListener {}
