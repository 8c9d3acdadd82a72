//! Error types for voice sessions
//!
//! Every variant renders with a stable, upper-case category prefix so that
//! presentation code can branch on the category without parsing free text.

use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session bridge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Microphone denied or unavailable
    #[error("PERMISSION_ERROR: {0}")]
    Permission(String),

    /// A required credential or identifier is missing from deployment config
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),

    /// Remote assistant creation failed
    #[error("PROVISIONING_ERROR: {0}")]
    Provisioning(String),

    /// Transport failed to open or dropped
    #[error("CONNECTION_ERROR: {0}")]
    Connection(String),

    /// Isolated malformed or unexpected inbound message
    #[error("STREAM_ERROR: {0}")]
    TransientStream(String),

    /// `stop` was called before `start` finished
    #[error("CANCELLED: {0}")]
    Cancelled(String),
}

/// Error category, one per `SessionError` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Permission,
    Configuration,
    Provisioning,
    Connection,
    TransientStream,
    Cancelled,
}

impl ErrorCategory {
    /// Stable prefix used in messages and API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Permission => "PERMISSION_ERROR",
            ErrorCategory::Configuration => "CONFIGURATION_ERROR",
            ErrorCategory::Provisioning => "PROVISIONING_ERROR",
            ErrorCategory::Connection => "CONNECTION_ERROR",
            ErrorCategory::TransientStream => "STREAM_ERROR",
            ErrorCategory::Cancelled => "CANCELLED",
        }
    }

    /// Whether retrying without a deployment change can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::Configuration)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SessionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Permission(_) => ErrorCategory::Permission,
            SessionError::Configuration(_) => ErrorCategory::Configuration,
            SessionError::Provisioning(_) => ErrorCategory::Provisioning,
            SessionError::Connection(_) => ErrorCategory::Connection,
            SessionError::TransientStream(_) => ErrorCategory::TransientStream,
            SessionError::Cancelled(_) => ErrorCategory::Cancelled,
        }
    }

    /// Fatal errors end the session; transient ones are logged and skipped
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::TransientStream(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match &err {
            WsError::Http(resp) => {
                let code = resp.status().as_u16();
                if code == 401 || code == 403 {
                    SessionError::Connection(format!("authentication failed (HTTP {})", code))
                } else {
                    SessionError::Connection(format!("handshake rejected (HTTP {})", code))
                }
            }
            _ => SessionError::Connection(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::TransientStream(format!("invalid message: {}", err))
    }
}
