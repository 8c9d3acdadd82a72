pub mod backend;
pub mod convert;
pub mod mixer;
pub mod pcm;
pub mod playback;

#[cfg(feature = "device")]
pub mod device;

pub use backend::{
    AudioBackendConfig, AudioBackendFactory, AudioFrame, CaptureBackend, DeviceBackendFactory,
    OutputBackend,
};
pub use mixer::{MixerConfig, PlaybackMixer};
pub use pcm::{decode_frame, encode_frame, PlayableBuffer, WireFrame};
pub use playback::{PlaybackId, PlaybackQueue, PlaybackSink, ScheduledChunk};
