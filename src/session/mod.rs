//! Call lifecycle
//!
//! `SessionBridge` starts calls; each call is a `SessionHandle` that owns:
//! - the transport link to the voice endpoint
//! - microphone capture and speaker output
//! - the playback queue and the transcript reconciler
//! - per-call statistics

mod bridge;
mod config;
mod session;
mod stats;

pub use bridge::{SessionBridge, StartOptions};
pub use config::{SessionBackend, SessionConfig};
pub use session::SessionHandle;
pub use stats::{ConnectionState, SessionStats};
