pub mod audio;
pub mod business;
pub mod config;
pub mod error;
pub mod http;
pub mod provisioning;
pub mod session;
pub mod transcript;
pub mod transport;

pub use audio::{
    AudioBackendConfig, AudioBackendFactory, AudioFrame, CaptureBackend, DeviceBackendFactory,
    OutputBackend, PlaybackMixer, PlaybackQueue,
};
pub use business::{BusinessConfig, Tone, Voice};
pub use config::Config;
pub use error::{ErrorCategory, SessionError, SessionResult};
pub use http::{allow_origins, create_router, AppState};
pub use provisioning::{AssistantApi, AssistantProvisioner, HttpAssistantApi};
pub use session::{
    ConnectionState, SessionBackend, SessionBridge, SessionConfig, SessionHandle, SessionStats,
    StartOptions,
};
pub use transcript::{Speaker, TranscriptFragment, TranscriptReconciler, TranscriptSnapshot, Utterance};
pub use transport::{
    AssistantId, Connector, InboundEvent, SessionListener, SessionTarget, TransportLink,
    WebSocketConnector,
};
