//! Connection to the remote voice endpoint
//!
//! A `Connector` opens one bidirectional link per call. The link is split into
//! a bounded outbound audio path, an ordered inbound event stream, and a
//! closer that tears the connection down.

pub mod events;
pub mod messages;
pub mod websocket;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::pcm::WireFrame;
use crate::error::SessionResult;

pub use events::{AssistantId, InboundEvent, LiveConfig, NoopListener, SessionListener, SessionTarget};
pub use websocket::WebSocketConnector;

/// Opens transport links
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Connect and complete setup for `target`
    ///
    /// Only returns once the remote side has accepted the setup.
    async fn connect(&self, target: &SessionTarget) -> SessionResult<TransportLink>;

    /// Get connector name for logging
    fn name(&self) -> &str;
}

/// An open connection, before it is split across session tasks
pub struct TransportLink {
    outbound: mpsc::Sender<WireFrame>,
    inbound: mpsc::Receiver<InboundEvent>,
    closer: LinkCloser,
}

impl TransportLink {
    /// Wrap channels served by a pump task
    pub fn new(
        outbound: mpsc::Sender<WireFrame>,
        inbound: mpsc::Receiver<InboundEvent>,
        shutdown: oneshot::Sender<()>,
        pump: JoinHandle<()>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            closer: LinkCloser {
                shutdown: Some(shutdown),
                pump: Some(pump),
            },
        }
    }

    /// Wrap bare channels (no background pump), e.g. an in-process endpoint
    pub fn from_channels(
        outbound: mpsc::Sender<WireFrame>,
        inbound: mpsc::Receiver<InboundEvent>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            closer: LinkCloser {
                shutdown: None,
                pump: None,
            },
        }
    }

    pub fn into_parts(self) -> (OutboundAudio, mpsc::Receiver<InboundEvent>, LinkCloser) {
        (OutboundAudio::new(self.outbound), self.inbound, self.closer)
    }

    pub async fn close(self) {
        self.closer.close().await;
    }
}

/// Non-blocking sender for microphone frames
///
/// Frames that do not fit in the bounded queue are dropped rather than
/// buffered, so latency never grows without bound.
#[derive(Clone)]
pub struct OutboundAudio {
    tx: mpsc::Sender<WireFrame>,
    sent: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

/// Result of offering a frame to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    Dropped,
    Closed,
}

impl OutboundAudio {
    fn new(tx: mpsc::Sender<WireFrame>) -> Self {
        Self {
            tx,
            sent: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn push(&self, frame: WireFrame) -> PushOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Sent
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Outbound audio queue full, dropped frame ({} total)", dropped);
                PushOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// How long `close` waits for the pump to flush its close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Tears a link down
pub struct LinkCloser {
    shutdown: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
}

impl LinkCloser {
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // Pump already gone if this fails
            let _ = shutdown.send(());
        }

        if let Some(mut pump) = self.pump.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, &mut pump).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Transport pump task failed: {}", e),
                Err(_) => {
                    warn!("Transport pump did not stop in time, aborting");
                    pump.abort();
                }
            }
        }
    }
}
