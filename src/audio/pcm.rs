//! PCM wire codec
//!
//! Outbound audio is 16-bit signed little-endian PCM at 16 kHz mono; inbound
//! audio is the same encoding at 24 kHz. Both travel base64-encoded next to a
//! MIME-style rate descriptor.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Sample rate of audio sent to the remote endpoint
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Default sample rate of audio received from the remote endpoint
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Base64 PCM with its rate descriptor, as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFrame {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

impl WireFrame {
    pub fn pcm(sample_rate: u32, pcm_bytes: &[u8]) -> Self {
        Self {
            mime_type: format!("audio/pcm;rate={}", sample_rate),
            data: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
        }
    }

    /// Sample rate from the `rate=` parameter, if present
    pub fn sample_rate(&self) -> Option<u32> {
        self.mime_type
            .split(';')
            .filter_map(|param| param.trim().strip_prefix("rate="))
            .find_map(|rate| rate.trim().parse().ok())
    }
}

/// Decoded audio ready for scheduling, one plane per channel
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PlayableBuffer {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Average all channel planes into one
    pub fn to_mono(&self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels[0].clone(),
            n => (0..self.frame_count())
                .map(|i| self.channels.iter().map(|plane| plane[i]).sum::<f32>() / n as f32)
                .collect(),
        }
    }
}

/// Normalized float samples to 16-bit PCM (clipped)
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let scaled = s.clamp(-1.0, 1.0) * 32768.0;
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect()
}

pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode a mono 16 kHz capture buffer into an outbound wire frame
pub fn encode_frame(samples: &[f32]) -> WireFrame {
    let pcm = float_to_pcm16(samples);
    WireFrame::pcm(INPUT_SAMPLE_RATE, &pcm16_to_bytes(&pcm))
}

/// Decode an inbound wire frame, de-interleaving `channels` planes
pub fn decode_frame(frame: &WireFrame, channels: u16) -> SessionResult<PlayableBuffer> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(frame.data.as_bytes())
        .map_err(|e| SessionError::TransientStream(format!("invalid base64 audio: {}", e)))?;

    let sample_rate = frame.sample_rate().unwrap_or(OUTPUT_SAMPLE_RATE);
    decode_pcm(&bytes, sample_rate, channels)
}

/// Decode raw little-endian 16-bit PCM bytes
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> SessionResult<PlayableBuffer> {
    if channels == 0 {
        return Err(SessionError::TransientStream("channel count must be at least 1".into()));
    }

    if bytes.len() % 2 != 0 {
        return Err(SessionError::TransientStream(format!(
            "PCM payload has odd length {}",
            bytes.len()
        )));
    }

    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let channel_count = channels as usize;
    if samples.len() % channel_count != 0 {
        return Err(SessionError::TransientStream(format!(
            "{} samples do not divide into {} channels",
            samples.len(),
            channel_count
        )));
    }

    let frame_count = samples.len() / channel_count;
    let planes = (0..channel_count)
        .map(|channel| {
            (0..frame_count)
                .map(|i| samples[i * channel_count + channel] as f32 / 32768.0)
                .collect()
        })
        .collect();

    Ok(PlayableBuffer {
        sample_rate,
        channels: planes,
    })
}
