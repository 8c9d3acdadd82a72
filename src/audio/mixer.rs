// Playback mixer: the software output clock
//
// Scheduled chunks are stored with their start position in output samples.
// An output device (or a test) pulls rendered audio with `render()`, which
// sums every chunk overlapping the requested window with clipping, advances
// the clock, and reports chunks that ran to completion.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::convert::resample_linear;
use super::pcm::PlayableBuffer;
use super::playback::{PlaybackId, PlaybackSink};

/// Configuration for the playback mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Output sample rate (the device's rate)
    pub sample_rate: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self { sample_rate: 24000 }
    }
}

/// A chunk resampled to the output rate, waiting for or in playback
struct Voice {
    start_sample: u64,
    samples: Vec<f32>,
}

impl Voice {
    fn end_sample(&self) -> u64 {
        self.start_sample + self.samples.len() as u64
    }
}

struct MixerState {
    voices: BTreeMap<PlaybackId, Voice>,
    /// Output samples rendered so far (the clock)
    position: u64,
}

pub struct PlaybackMixer {
    config: MixerConfig,
    state: Mutex<MixerState>,
    completions: mpsc::UnboundedSender<PlaybackId>,
}

impl PlaybackMixer {
    /// Create a mixer and the receiver of natural-completion notifications
    pub fn new(config: MixerConfig) -> (Self, mpsc::UnboundedReceiver<PlaybackId>) {
        info!("Playback mixer initialized: {}Hz", config.sample_rate);

        let (completions, completions_rx) = mpsc::unbounded_channel();

        let mixer = Self {
            config,
            state: Mutex::new(MixerState {
                voices: BTreeMap::new(),
                position: 0,
            }),
            completions,
        };

        (mixer, completions_rx)
    }

    fn lock(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Number of chunks scheduled or playing
    pub fn voice_count(&self) -> usize {
        self.lock().voices.len()
    }

    /// Fill `out` with mono output audio and advance the clock
    pub fn render(&self, out: &mut [f32]) {
        let mut state = self.lock();
        let window_start = state.position;
        let window_end = window_start + out.len() as u64;

        out.fill(0.0);

        for voice in state.voices.values() {
            if voice.end_sample() <= window_start || voice.start_sample >= window_end {
                continue;
            }

            let from = voice.start_sample.max(window_start);
            let to = voice.end_sample().min(window_end);
            for pos in from..to {
                let sample = voice.samples[(pos - voice.start_sample) as usize];
                let slot = &mut out[(pos - window_start) as usize];
                *slot = (*slot + sample).clamp(-1.0, 1.0);
            }
        }

        state.position = window_end;

        let finished: Vec<PlaybackId> = state
            .voices
            .iter()
            .filter(|(_, voice)| voice.end_sample() <= window_end)
            .map(|(id, _)| *id)
            .collect();

        for id in finished {
            state.voices.remove(&id);
            debug!("Chunk {} finished at sample {}", id, window_end);
            // Receiver gone means the session is tearing down
            let _ = self.completions.send(id);
        }
    }

    /// Advance the clock by `secs` of output, discarding the audio
    pub fn advance(&self, secs: f64) {
        let samples = (secs * self.config.sample_rate as f64).round() as usize;
        let mut scratch = vec![0.0; samples];
        self.render(&mut scratch);
    }
}

impl PlaybackSink for PlaybackMixer {
    fn current_time(&self) -> f64 {
        self.lock().position as f64 / self.config.sample_rate as f64
    }

    fn play_at(&self, id: PlaybackId, buffer: PlayableBuffer, start_at: f64) {
        let samples = resample_linear(&buffer.to_mono(), buffer.sample_rate, self.config.sample_rate);
        let start_sample = (start_at * self.config.sample_rate as f64).round().max(0.0) as u64;

        self.lock().voices.insert(
            id,
            Voice {
                start_sample,
                samples,
            },
        );
    }

    fn stop(&self, id: PlaybackId) {
        self.lock().voices.remove(&id);
    }
}
