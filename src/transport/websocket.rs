use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::events::{InboundEvent, SessionTarget};
use super::messages::{parse_events, RealtimeInputMessage, ServerMessage, SetupMessage};
use super::{Connector, TransportLink};
use crate::audio::pcm::WireFrame;
use crate::error::{SessionError, SessionResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connector for the remote voice endpoint over WebSocket
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    endpoint: String,
    api_key: Option<String>,
    connect_timeout: Duration,
    outbound_queue_depth: usize,
    inbound_queue_depth: usize,
}

impl WebSocketConnector {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            connect_timeout: Duration::from_secs(10),
            outbound_queue_depth: 32,
            inbound_queue_depth: 256,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Outbound frames that may wait for the socket before new ones are dropped
    pub fn with_outbound_queue_depth(mut self, depth: usize) -> Self {
        self.outbound_queue_depth = depth.max(1);
        self
    }

    fn url(&self) -> String {
        match &self.api_key {
            Some(key) if !key.is_empty() => {
                let separator = if self.endpoint.contains('?') { '&' } else { '?' };
                format!("{}{}key={}", self.endpoint, separator, key)
            }
            _ => self.endpoint.clone(),
        }
    }

    async fn handshake(&self, target: &SessionTarget) -> SessionResult<(WsSink, WsSource)> {
        let (ws, _response) = connect_async(self.url()).await?;
        let (mut sink, mut source) = ws.split();

        let setup = serde_json::to_string(&SetupMessage::for_target(target))
            .map_err(|e| SessionError::Connection(format!("failed to encode setup: {}", e)))?;
        sink.send(Message::Text(setup.into())).await?;

        wait_for_setup(&mut source).await?;

        Ok((sink, source))
    }
}

/// Read until the server acknowledges setup
async fn wait_for_setup(source: &mut WsSource) -> SessionResult<()> {
    while let Some(message) = source.next().await {
        let payload = match message? {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(bytes) => bytes.to_vec(),
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_string())
                    .unwrap_or_default();
                return Err(SessionError::Connection(format!(
                    "connection closed during setup: {}",
                    reason
                )));
            }
            _ => continue,
        };

        let message = match ServerMessage::parse(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unparseable message during setup: {}", e);
                continue;
            }
        };

        if let Some(error) = message.error {
            return Err(SessionError::Connection(format!(
                "setup rejected: {}",
                error.message
            )));
        }

        if message.setup_complete.is_some() {
            return Ok(());
        }

        debug!("Ignoring message received before setup completed");
    }

    Err(SessionError::Connection("connection closed during setup".to_string()))
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, target: &SessionTarget) -> SessionResult<TransportLink> {
        info!("Connecting to voice endpoint for {}", target.describe());

        let (sink, source) = tokio::time::timeout(self.connect_timeout, self.handshake(target))
            .await
            .map_err(|_| {
                SessionError::Connection(format!(
                    "timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })??;

        info!("Voice endpoint connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_queue_depth);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.inbound_queue_depth);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let pump = tokio::spawn(pump(sink, source, outbound_rx, inbound_tx, shutdown_rx));

        Ok(TransportLink::new(outbound_tx, inbound_rx, shutdown_tx, pump))
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

/// Full-duplex loop: outbound audio to the socket, socket messages to events
async fn pump(
    mut sink: WsSink,
    mut source: WsSource,
    mut outbound_rx: mpsc::Receiver<WireFrame>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("Transport pump started");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!("Close frame not sent: {}", e);
                }
                break;
            }

            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };

                let payload = match serde_json::to_string(&RealtimeInputMessage::audio(frame)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to encode audio frame: {}", e);
                        continue;
                    }
                };

                if let Err(e) = sink.send(Message::Text(payload.into())).await {
                    error!("Failed to send audio frame: {}", e);
                    let _ = inbound_tx.send(InboundEvent::Error(e.into())).await;
                    break;
                }
            }

            message = source.next() => {
                let events = match message {
                    Some(Ok(Message::Text(text))) => parse_events(text.as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => parse_events(&bytes),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.as_str().to_string());
                        info!("Voice endpoint closed the connection: {:?}", reason);
                        let _ = inbound_tx.send(InboundEvent::Closed { reason }).await;
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Voice endpoint connection failed: {}", e);
                        let _ = inbound_tx.send(InboundEvent::Error(e.into())).await;
                        break;
                    }
                    None => {
                        let _ = inbound_tx.send(InboundEvent::Closed { reason: None }).await;
                        break;
                    }
                };

                let mut receiver_gone = false;
                for event in events {
                    if inbound_tx.send(event).await.is_err() {
                        receiver_gone = true;
                        break;
                    }
                }
                if receiver_gone {
                    break;
                }
            }
        }
    }

    debug!("Transport pump stopped");
}
