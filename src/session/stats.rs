use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Active,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Closed => "closed",
        }
    }
}

/// Statistics about a call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub state: ConnectionState,

    /// When audio started flowing, if it ever did
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds between `started_at` and now (or the end of the call)
    pub duration_secs: f64,

    /// Microphone frames handed to the transport
    pub frames_sent: u64,

    /// Microphone frames dropped because the transport was behind
    pub frames_dropped: u64,

    /// Agent audio chunks scheduled for playback
    pub chunks_scheduled: u64,

    pub interruptions: u64,

    /// Utterances committed to the transcript
    pub utterances: u64,
}
