// Sample-format conversion between device audio and the wire format
//
// Devices capture at whatever rate and channel layout they support; the
// remote endpoint wants 16 kHz mono. Inbound 24 kHz audio likewise has to be
// brought to the output device's rate before mixing.

use super::backend::AudioFrame;

/// Bring a captured frame to `target_rate` mono
pub fn prepare_outbound(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    let mut processed = frame;

    // Convert to mono first so resampling touches fewer samples
    if processed.channels > 1 {
        processed = downmix_frame(processed);
    }

    if processed.sample_rate != target_rate {
        processed = AudioFrame {
            samples: resample_linear(&processed.samples, processed.sample_rate, target_rate),
            sample_rate: target_rate,
            channels: processed.channels,
            timestamp_ms: processed.timestamp_ms,
        };
    }

    processed
}

/// Average interleaved channels into mono
fn downmix_frame(frame: AudioFrame) -> AudioFrame {
    AudioFrame {
        samples: downmix(&frame.samples, frame.channels),
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}

pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler for mono audio
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let index = pos.floor() as usize;
            if index >= last {
                return samples[last];
            }
            let frac = (pos - index as f64) as f32;
            samples[index] + (samples[index + 1] - samples[index]) * frac
        })
        .collect()
}
