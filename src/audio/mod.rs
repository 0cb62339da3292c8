pub mod codec;
pub mod frame;
pub mod mixer;
pub mod playback;

pub use frame::{
    AudioFrame, FrameSource, CAPTURE_FRAME_SAMPLES, CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE,
};
pub use mixer::{MixerConfig, RecordingMixer};
pub use playback::{DecodedAudio, MonotonicClock, OutputClock, PlaybackScheduler};
