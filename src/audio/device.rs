// Host audio devices via cpal
//
// cpal streams are not Send, so each stream lives on a dedicated thread that
// owns it until told to stop. Dropping the stream releases the device.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::backend::{AudioBackendConfig, AudioFrame, CaptureBackend, OutputBackend};
use super::mixer::PlaybackMixer;
use crate::error::{SessionError, SessionResult};

/// Thread owning a live cpal stream
struct StreamWorker {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl StreamWorker {
    /// Spawn a thread that builds a stream with `build`, reports readiness,
    /// and holds the stream until stopped
    async fn spawn<F>(name: &str, build: F) -> SessionResult<Self>
    where
        F: FnOnce() -> SessionResult<cpal::Stream> + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match build() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Hold the stream until stop() or the worker is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| SessionError::Permission(format!("failed to spawn audio thread: {}", e)))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self { stop_tx, thread }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(SessionError::Permission("audio thread exited during startup".into())),
        }
    }

    async fn stop(self) {
        let _ = self.stop_tx.send(());
        let thread = self.thread;
        if tokio::task::spawn_blocking(move || thread.join()).await.is_err() {
            warn!("Audio thread join failed");
        }
    }
}

/// Default microphone
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    worker: Option<StreamWorker>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

fn build_input_stream(
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> SessionResult<cpal::Stream> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| SessionError::Permission("no microphone available".to_string()))?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device
        .default_input_config()
        .map_err(|e| SessionError::Permission(format!("microphone unavailable: {}", e)))?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let batch = config.capture_buffer_size.max(1) * channels as usize;

    let started = Instant::now();
    let mut pending: Vec<f32> = Vec::with_capacity(batch);
    let mut push = move |samples: &mut dyn Iterator<Item = f32>| {
        for sample in samples {
            pending.push(sample);
            if pending.len() >= batch {
                let frame = AudioFrame {
                    samples: std::mem::replace(&mut pending, Vec::with_capacity(batch)),
                    sample_rate,
                    channels,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };
                // Never block the device thread; a full queue drops the batch
                if frame_tx.try_send(frame).is_err() {
                    debug!("Capture queue full, dropping frame");
                }
            }
        }
    };

    let on_error = |err: cpal::StreamError| warn!("Audio input stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| push(&mut data.iter().copied()),
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                push(&mut data.iter().map(|&s| s as f32 / 32768.0))
            },
            on_error,
            None,
        ),
        other => {
            return Err(SessionError::Permission(format!(
                "unsupported microphone sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| SessionError::Permission(format!("microphone access denied: {}", e)))?;

    stream
        .play()
        .map_err(|e| SessionError::Permission(format!("microphone failed to start: {}", e)))?;

    info!("Microphone capture started ({}Hz, {} channels)", sample_rate, channels);

    Ok(stream)
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.worker.is_some() {
            return Err(SessionError::Permission("microphone already in use by this session".into()));
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.capture_queue_depth.max(1));
        let config = self.config.clone();
        let worker =
            StreamWorker::spawn("frontdesk-capture", move || build_input_stream(config, frame_tx))
                .await?;

        self.worker = Some(worker);
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if let Some(worker) = self.worker.take() {
            info!("Releasing microphone");
            worker.stop().await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// Default speakers, pulling from a playback mixer
pub struct SpeakerBackend {
    sample_rate: u32,
    worker: Option<StreamWorker>,
}

impl SpeakerBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        let sample_rate = cpal::default_host()
            .default_output_device()
            .and_then(|device| device.default_output_config().ok())
            .map(|supported| supported.sample_rate().0)
            .unwrap_or(config.output_sample_rate);

        Self {
            sample_rate,
            worker: None,
        }
    }
}

fn build_output_stream(mixer: Arc<PlaybackMixer>) -> SessionResult<cpal::Stream> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| SessionError::Permission("no speaker available".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| SessionError::Permission(format!("speaker unavailable: {}", e)))?;
    let mut stream_config: cpal::StreamConfig = supported.into();
    stream_config.sample_rate = cpal::SampleRate(mixer.sample_rate());
    let channels = (stream_config.channels as usize).max(1);

    info!(
        "Starting speaker output ({}Hz, {} channels)",
        stream_config.sample_rate.0, stream_config.channels
    );

    let mut mono: Vec<f32> = Vec::new();
    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mono.resize(data.len() / channels, 0.0);
                mixer.render(&mut mono);
                for (frame, sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    frame.fill(*sample);
                }
            },
            |err: cpal::StreamError| warn!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|e| SessionError::Permission(format!("speaker unavailable: {}", e)))?;

    stream
        .play()
        .map_err(|e| SessionError::Permission(format!("speaker failed to start: {}", e)))?;

    Ok(stream)
}

#[async_trait::async_trait]
impl OutputBackend for SpeakerBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn start(&mut self, mixer: Arc<PlaybackMixer>) -> SessionResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let worker =
            StreamWorker::spawn("frontdesk-playback", move || build_output_stream(mixer)).await?;

        self.worker = Some(worker);
        Ok(())
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if let Some(worker) = self.worker.take() {
            info!("Closing speaker output");
            worker.stop().await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal speaker"
    }
}
