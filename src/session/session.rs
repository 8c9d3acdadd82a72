use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stats::{ConnectionState, SessionStats};
use crate::audio::convert::prepare_outbound;
use crate::audio::pcm::{decode_frame, encode_frame, INPUT_SAMPLE_RATE};
use crate::audio::{AudioFrame, CaptureBackend, OutputBackend, PlaybackId, PlaybackQueue};
use crate::error::{SessionError, SessionResult};
use crate::transcript::{TranscriptReconciler, TranscriptSnapshot, Utterance};
use crate::transport::{InboundEvent, LinkCloser, OutboundAudio, PushOutcome, SessionListener};

/// One call: connection state, owned resources, transcript and counters
///
/// Cloning is cheap and every clone refers to the same call, so one task can
/// `stop` a handle while another is still inside `SessionBridge::start`.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: String,
    listener: Arc<dyn SessionListener>,
    state: StdMutex<ConnectionState>,
    cancel: watch::Sender<bool>,
    /// Also serializes start against stop
    resources: Mutex<Option<ActiveResources>>,
    reconciler: StdMutex<TranscriptReconciler>,
    outbound: StdMutex<Option<OutboundAudio>>,
    timeline: StdMutex<Timeline>,
    counters: Counters,
}

#[derive(Default)]
struct Timeline {
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Counters {
    chunks_scheduled: AtomicU64,
    interruptions: AtomicU64,
    utterances: AtomicU64,
}

/// Everything a live call holds open
#[derive(Default)]
pub(crate) struct ActiveResources {
    pub(crate) closer: Option<LinkCloser>,
    pub(crate) output: Option<Box<dyn OutputBackend>>,
    pub(crate) capture: Option<Box<dyn CaptureBackend>>,
    pub(crate) queue: Option<Arc<PlaybackQueue>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveResources {
    /// Tear down in dependency order. Failures are logged, never returned.
    pub(crate) async fn release(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Some(closer) = self.closer.take() {
            closer.close().await;
        }

        if let Some(queue) = self.queue.take() {
            let stopped = queue.interrupt();
            queue.close();
            if stopped > 0 {
                debug!("Stopped {} playing chunk(s)", stopped);
            }
        }

        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.stop().await {
                warn!("Failed to stop {}: {}", output.name(), e);
            }
        }

        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop {}: {}", capture.name(), e);
            }
        }
    }
}

/// Channels handed to the activity tasks once the call goes live
pub(crate) struct ActivityChannels {
    pub(crate) frames: mpsc::Receiver<AudioFrame>,
    pub(crate) outbound: OutboundAudio,
    pub(crate) inbound: mpsc::Receiver<InboundEvent>,
    pub(crate) completions: mpsc::UnboundedReceiver<PlaybackId>,
    pub(crate) queue: Arc<PlaybackQueue>,
    pub(crate) inbound_channels: u16,
}

fn lock<T>(mutex: &StdMutex<T>) -> StdMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionHandle {
    pub(crate) fn new(listener: Arc<dyn SessionListener>) -> Self {
        let (cancel, _) = watch::channel(false);

        Self {
            inner: Arc::new(SessionInner {
                id: uuid::Uuid::new_v4().to_string(),
                listener,
                state: StdMutex::new(ConnectionState::Idle),
                cancel,
                resources: Mutex::new(None),
                reconciler: StdMutex::new(TranscriptReconciler::new()),
                outbound: StdMutex::new(None),
                timeline: StdMutex::new(Timeline::default()),
                counters: Counters::default(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Committed history plus the in-progress line
    pub fn transcript(&self) -> TranscriptSnapshot {
        lock(&self.inner.reconciler).snapshot()
    }

    pub fn history(&self) -> Vec<Utterance> {
        lock(&self.inner.reconciler).history().to_vec()
    }

    pub fn stats(&self) -> SessionStats {
        let (started_at, ended_at) = {
            let timeline = lock(&self.inner.timeline);
            (timeline.started_at, timeline.ended_at)
        };

        let duration_secs = started_at
            .map(|start| {
                let end = ended_at.unwrap_or_else(Utc::now);
                end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        let (frames_sent, frames_dropped) = lock(&self.inner.outbound)
            .as_ref()
            .map(|outbound| (outbound.frames_sent(), outbound.frames_dropped()))
            .unwrap_or((0, 0));

        let counters = &self.inner.counters;
        SessionStats {
            state: self.state(),
            started_at,
            duration_secs,
            frames_sent,
            frames_dropped,
            chunks_scheduled: counters.chunks_scheduled.load(Ordering::Relaxed),
            interruptions: counters.interruptions.load(Ordering::Relaxed),
            utterances: counters.utterances.load(Ordering::Relaxed),
        }
    }

    /// End the call and release everything it holds
    ///
    /// Callable in any state, any number of times. A `start` still in flight
    /// is cancelled and returns `SessionError::Cancelled`.
    pub async fn stop(&self) {
        self.inner.cancel.send_replace(true);

        let mut slot = self.inner.resources.lock().await;
        let previous = self.set_state(ConnectionState::Closed);

        if let Some(resources) = slot.take() {
            info!("Stopping session {}", self.id());
            resources.release().await;
        }
        drop(slot);

        if previous == ConnectionState::Active {
            self.fold_transcript(TranscriptReconciler::end_call);
            lock(&self.inner.timeline).ended_at = Some(Utc::now());

            info!("Session {} ended", self.id());
            self.inner.listener.on_call_end();
        }
    }

    fn stop_in_background(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            handle.stop().await;
        });
    }

    fn set_state(&self, next: ConnectionState) -> ConnectionState {
        std::mem::replace(&mut *lock(&self.inner.state), next)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    pub(crate) fn ensure_not_cancelled(&self) -> SessionResult<()> {
        if self.is_cancelled() {
            return Err(SessionError::Cancelled("session stopped while starting".to_string()));
        }
        Ok(())
    }

    /// Run one start step, giving up as soon as the handle is stopped
    pub(crate) async fn until_cancelled<T>(
        &self,
        step: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        let stopped = wait_stopped(self.inner.cancel.subscribe());

        tokio::select! {
            result = step => result,
            _ = stopped => Err(SessionError::Cancelled("session stopped while starting".to_string())),
        }
    }

    /// Drive `establish` and, if it succeeds, make the call live
    pub(crate) async fn start_with(
        &self,
        establish: impl Future<Output = SessionResult<(ActiveResources, ActivityChannels)>>,
    ) -> SessionResult<()> {
        let mut slot = self.inner.resources.lock().await;

        match self.state() {
            ConnectionState::Idle if !self.is_cancelled() => {}
            ConnectionState::Idle | ConnectionState::Closed => {
                return Err(SessionError::Cancelled("session was already stopped".to_string()));
            }
            ConnectionState::Connecting | ConnectionState::Active => {
                return Err(SessionError::Cancelled("session already started".to_string()));
            }
        }
        self.set_state(ConnectionState::Connecting);

        let (resources, channels) = match establish.await {
            Ok(acquired) => acquired,
            Err(e) => {
                self.set_state(ConnectionState::Closed);
                warn!("Session {} failed to start: {}", self.id(), e);
                if !matches!(e, SessionError::Cancelled(_)) {
                    self.inner.listener.on_error(&e);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.ensure_not_cancelled() {
            self.set_state(ConnectionState::Closed);
            resources.release().await;
            return Err(e);
        }

        *lock(&self.inner.outbound) = Some(channels.outbound.clone());
        lock(&self.inner.timeline).started_at = Some(Utc::now());
        self.set_state(ConnectionState::Active);
        info!("Session {} is live", self.id());

        self.inner.listener.on_open();
        self.inner.listener.on_call_start();

        let resources = slot.insert(resources);
        resources.tasks.push(tokio::spawn(forward_capture(
            channels.frames,
            channels.outbound,
        )));
        resources.tasks.push(tokio::spawn(forward_completions(
            channels.completions,
            Arc::clone(&channels.queue),
        )));
        resources.tasks.push(tokio::spawn(run_inbound(
            self.clone(),
            channels.inbound,
            channels.queue,
            channels.inbound_channels,
        )));

        Ok(())
    }

    fn fold_transcript(&self, step: impl FnOnce(&mut TranscriptReconciler) -> Option<Utterance>) {
        let committed = step(&mut *lock(&self.inner.reconciler));
        if let Some(utterance) = committed {
            self.inner.counters.utterances.fetch_add(1, Ordering::Relaxed);
            debug!("Committed {:?} utterance: {}", utterance.speaker, utterance.text);
        }
    }
}

async fn wait_stopped(mut cancel: watch::Receiver<bool>) {
    // Errors only if the sender is gone, which also means stopped
    let _ = cancel.wait_for(|stopped| *stopped).await;
}

/// Microphone frames to the transport, downmixed and resampled to 16 kHz
async fn forward_capture(mut frames: mpsc::Receiver<AudioFrame>, outbound: OutboundAudio) {
    debug!("Capture forwarding task started");

    while let Some(frame) = frames.recv().await {
        let prepared = prepare_outbound(frame, INPUT_SAMPLE_RATE);
        if prepared.samples.is_empty() {
            continue;
        }

        if outbound.push(encode_frame(&prepared.samples)) == PushOutcome::Closed {
            debug!("Transport closed, no longer forwarding capture");
            break;
        }
    }

    debug!("Capture forwarding task stopped");
}

async fn forward_completions(
    mut completions: mpsc::UnboundedReceiver<PlaybackId>,
    queue: Arc<PlaybackQueue>,
) {
    while let Some(id) = completions.recv().await {
        queue.finished(id);
    }
}

/// Apply inbound events one at a time, in arrival order
async fn run_inbound(
    handle: SessionHandle,
    mut events: mpsc::Receiver<InboundEvent>,
    queue: Arc<PlaybackQueue>,
    channels: u16,
) {
    let listener = Arc::clone(&handle.inner.listener);
    let counters = &handle.inner.counters;

    while let Some(event) = events.recv().await {
        match event {
            InboundEvent::AudioChunk(frame) => {
                listener.on_audio_chunk(&frame);
                match decode_frame(&frame, channels) {
                    Ok(buffer) => {
                        if queue.schedule(buffer).is_some() {
                            counters.chunks_scheduled.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) => warn!("Skipping audio chunk: {}", e),
                }
            }
            InboundEvent::Transcript(fragment) => {
                listener.on_transcript(&fragment.text, fragment.speaker);
                handle.fold_transcript(|reconciler| reconciler.apply(fragment));
            }
            InboundEvent::TurnComplete => {
                handle.fold_transcript(TranscriptReconciler::turn_complete);
                listener.on_turn_complete();
            }
            InboundEvent::Interrupted => {
                let stopped = queue.interrupt();
                counters.interruptions.fetch_add(1, Ordering::Relaxed);
                debug!("Agent interrupted, stopped {} chunk(s)", stopped);
                listener.on_interrupted();
            }
            InboundEvent::Error(e) if !e.is_fatal() => {
                warn!("Ignoring stream error: {}", e);
            }
            InboundEvent::Error(e) => {
                error!("Session {} failed: {}", handle.id(), e);
                listener.on_error(&e);
                handle.stop_in_background();
                return;
            }
            InboundEvent::Closed { reason } => {
                info!(
                    "Session {} closed by remote: {}",
                    handle.id(),
                    reason.as_deref().unwrap_or("no reason given")
                );
                listener.on_close();
                handle.stop_in_background();
                return;
            }
        }
    }

    info!("Session {} transport ended", handle.id());
    listener.on_close();
    handle.stop_in_background();
}
