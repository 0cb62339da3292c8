use crate::audio::codec;

/// Sample rate for outbound capture (what the agent expects as input)
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of inbound agent audio
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per outbound capture frame (~256 ms at 16 kHz)
pub const CAPTURE_FRAME_SAMPLES: usize = 4_096;

/// Which side of the conversation a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSource {
    /// The candidate's capture device
    Local,
    /// Agent audio scheduled for playback
    Remote,
}

/// Audio sample data (16-bit PCM, mono unless noted)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved when multi-channel)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the session started
    pub timestamp_ms: u64,
    /// Which side of the conversation produced this frame
    pub source: FrameSource,
}

impl AudioFrame {
    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        codec::duration_secs(
            self.samples.len() / usize::from(self.channels.max(1)),
            self.sample_rate,
        )
    }
}
