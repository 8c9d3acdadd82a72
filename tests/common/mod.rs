// Test doubles for the session's seams: connector, audio devices, listener
#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frontdesk_voice::audio::{
    AudioBackendConfig, AudioBackendFactory, AudioFrame, CaptureBackend, OutputBackend,
    PlaybackMixer, WireFrame,
};
use frontdesk_voice::business::{BusinessConfig, Tone, Voice};
use frontdesk_voice::transport::{Connector, InboundEvent, SessionListener, SessionTarget, TransportLink};
use frontdesk_voice::{SessionError, SessionResult, Speaker};
use tokio::sync::mpsc;

pub fn business() -> BusinessConfig {
    BusinessConfig {
        name: "Sunrise Dental".to_string(),
        industry: "Healthcare".to_string(),
        tone: Tone::Friendly,
        voice: Voice::Puck,
        instructions: "Help callers book cleanings.".to_string(),
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// Audio
// ============================================================================

#[derive(Default)]
pub struct AudioProbe {
    pub capture_starts: AtomicUsize,
    pub capture_stops: AtomicUsize,
    pub output_starts: AtomicUsize,
    pub output_stops: AtomicUsize,
    /// Sender feeding the most recently started capture
    pub microphone: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    pub mixer: Mutex<Option<Arc<PlaybackMixer>>>,
}

impl AudioProbe {
    pub fn microphone(&self) -> Option<mpsc::Sender<AudioFrame>> {
        self.microphone.lock().unwrap().clone()
    }

    pub fn mixer(&self) -> Option<Arc<PlaybackMixer>> {
        self.mixer.lock().unwrap().clone()
    }
}

/// Audio factory backed by channels instead of devices
pub struct FakeAudio {
    pub probe: Arc<AudioProbe>,
    pub deny_microphone: bool,
}

impl FakeAudio {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(AudioProbe::default()),
            deny_microphone: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            deny_microphone: true,
            ..Self::new()
        }
    }
}

impl AudioBackendFactory for FakeAudio {
    fn capture(&self, config: &AudioBackendConfig) -> SessionResult<Box<dyn CaptureBackend>> {
        Ok(Box::new(FakeCapture {
            probe: Arc::clone(&self.probe),
            deny: self.deny_microphone,
            depth: config.capture_queue_depth,
            capturing: false,
        }))
    }

    fn output(&self, _config: &AudioBackendConfig) -> SessionResult<Box<dyn OutputBackend>> {
        Ok(Box::new(FakeOutput {
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct FakeCapture {
    probe: Arc<AudioProbe>,
    deny: bool,
    depth: usize,
    capturing: bool,
}

#[async_trait::async_trait]
impl CaptureBackend for FakeCapture {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.deny {
            return Err(SessionError::Permission("microphone access denied".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.depth.max(1));
        *self.probe.microphone.lock().unwrap() = Some(tx);
        self.probe.capture_starts.fetch_add(1, Ordering::SeqCst);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if self.capturing {
            self.capturing = false;
            self.probe.microphone.lock().unwrap().take();
            self.probe.capture_stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "fake microphone"
    }
}

struct FakeOutput {
    probe: Arc<AudioProbe>,
}

#[async_trait::async_trait]
impl OutputBackend for FakeOutput {
    fn sample_rate(&self) -> u32 {
        24000
    }

    async fn start(&mut self, mixer: Arc<PlaybackMixer>) -> SessionResult<()> {
        *self.probe.mixer.lock().unwrap() = Some(mixer);
        self.probe.output_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if self.probe.mixer.lock().unwrap().take().is_some() {
            self.probe.output_stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake speakers"
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The far side of a fake link, as seen by the test
pub struct RemoteEnd {
    pub audio: mpsc::Receiver<WireFrame>,
    pub events: mpsc::Sender<InboundEvent>,
}

pub enum ConnectBehavior {
    Accept,
    Fail(SessionError),
    /// Never completes; only a stop gets the session out
    Hang,
}

pub struct FakeConnector {
    behavior: ConnectBehavior,
    outbound_depth: usize,
    pub connects: AtomicUsize,
    pub targets: Mutex<Vec<SessionTarget>>,
    pub remote: Mutex<Option<RemoteEnd>>,
}

impl FakeConnector {
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            outbound_depth: 64,
            connects: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
            remote: Mutex::new(None),
        }
    }

    pub fn with_outbound_depth(mut self, depth: usize) -> Self {
        self.outbound_depth = depth;
        self
    }

    pub fn take_remote(&self) -> RemoteEnd {
        self.remote
            .lock()
            .unwrap()
            .take()
            .expect("connector was not asked to connect")
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, target: &SessionTarget) -> SessionResult<TransportLink> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());

        match &self.behavior {
            ConnectBehavior::Accept => {
                let (audio_tx, audio_rx) = mpsc::channel(self.outbound_depth);
                let (events_tx, events_rx) = mpsc::channel(64);
                *self.remote.lock().unwrap() = Some(RemoteEnd {
                    audio: audio_rx,
                    events: events_tx,
                });
                Ok(TransportLink::from_channels(audio_tx, events_rx))
            }
            ConnectBehavior::Fail(e) => Err(e.clone()),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Records every callback as a short string
#[derive(Default)]
pub struct EventRecorder {
    pub events: Mutex<Vec<String>>,
}

impl EventRecorder {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == name).count()
    }

    pub fn saw(&self, prefix: &str) -> bool {
        self.events().iter().any(|e| e.starts_with(prefix))
    }
}

impl SessionListener for EventRecorder {
    fn on_open(&self) {
        self.record("open".to_string());
    }

    fn on_audio_chunk(&self, _frame: &WireFrame) {
        self.record("audio".to_string());
    }

    fn on_transcript(&self, text: &str, speaker: Speaker) {
        self.record(format!("transcript {:?}: {}", speaker, text));
    }

    fn on_turn_complete(&self) {
        self.record("turn_complete".to_string());
    }

    fn on_interrupted(&self) {
        self.record("interrupted".to_string());
    }

    fn on_error(&self, error: &SessionError) {
        self.record(format!("error {}", error));
    }

    fn on_close(&self) {
        self.record("close".to_string());
    }

    fn on_call_start(&self) {
        self.record("call_start".to_string());
    }

    fn on_call_end(&self) {
        self.record("call_end".to_string());
    }
}

/// Wait for a future with a generous timeout, failing the test instead of hanging
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation did not finish in time")
}
