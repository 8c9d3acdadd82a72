use std::sync::Arc;

use tokio::sync::mpsc;

use super::mixer::PlaybackMixer;
use crate::error::{SessionError, SessionResult};

/// Captured audio (f32 normalized to [-1, 1], interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw samples, interleaved when `channels > 1`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for audio backends
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Samples per capture callback batch (per channel)
    pub capture_buffer_size: usize,
    /// Capture frames buffered between the device thread and the session
    pub capture_queue_depth: usize,
    /// Preferred output sample rate (devices may override)
    pub output_sample_rate: u32,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            capture_buffer_size: 4096,
            capture_queue_depth: 32,
            output_sample_rate: 24000,
        }
    }
}

/// Microphone capture backend
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the microphone
    ///
    /// Returns a channel receiver that will receive audio frames. Fails with
    /// `SessionError::Permission` when the device is missing or denied.
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>>;

    /// Release the microphone. Safe to call when not capturing.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Speaker output backend, pulling rendered audio from a mixer
#[async_trait::async_trait]
pub trait OutputBackend: Send + Sync {
    /// Sample rate the mixer must render at
    fn sample_rate(&self) -> u32;

    /// Open the output device and start pulling from `mixer`
    async fn start(&mut self, mixer: Arc<PlaybackMixer>) -> SessionResult<()>;

    /// Close the output device. Safe to call when not started.
    async fn stop(&mut self) -> SessionResult<()>;

    fn name(&self) -> &str;
}

/// Creates fresh capture/output backends for each session
pub trait AudioBackendFactory: Send + Sync {
    fn capture(&self, config: &AudioBackendConfig) -> SessionResult<Box<dyn CaptureBackend>>;

    fn output(&self, config: &AudioBackendConfig) -> SessionResult<Box<dyn OutputBackend>>;
}

/// Factory for the host's default microphone and speakers
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceBackendFactory;

impl AudioBackendFactory for DeviceBackendFactory {
    fn capture(&self, config: &AudioBackendConfig) -> SessionResult<Box<dyn CaptureBackend>> {
        #[cfg(feature = "device")]
        {
            use super::device::MicrophoneBackend;
            Ok(Box::new(MicrophoneBackend::new(config.clone())))
        }

        #[cfg(not(feature = "device"))]
        {
            let _ = config;
            Err(SessionError::Permission(
                "built without audio device support (enable the `device` feature)".to_string(),
            ))
        }
    }

    fn output(&self, config: &AudioBackendConfig) -> SessionResult<Box<dyn OutputBackend>> {
        #[cfg(feature = "device")]
        {
            use super::device::SpeakerBackend;
            Ok(Box::new(SpeakerBackend::new(config.clone())))
        }

        #[cfg(not(feature = "device"))]
        {
            let _ = config;
            Err(SessionError::Permission(
                "built without audio device support (enable the `device` feature)".to_string(),
            ))
        }
    }
}
