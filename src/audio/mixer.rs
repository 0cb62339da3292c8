// Mixer for combining the candidate's capture stream with the agent's
// playback stream into the single recorded signal.
//
// Frames from each side are buffered separately, normalized to the
// recording sample rate, and mixed by saturating addition. Frames that
// fall too far behind the mix position are dropped to keep buffering
// bounded.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::audio::codec;
use crate::audio::frame::{AudioFrame, FrameSource};

/// Configuration for the recording mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Sample rate of the mixed output
    pub sample_rate: u32,
    /// Channel count of the mixed output
    pub channels: u16,
    /// Maximum buffering delay in milliseconds before old frames are dropped
    pub max_buffer_delay_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::audio::frame::PLAYBACK_SAMPLE_RATE,
            channels: 1,
            max_buffer_delay_ms: 500,
        }
    }
}

/// Mixes the local and remote audio streams for the recording sink
pub struct RecordingMixer {
    config: MixerConfig,
    buffers: HashMap<FrameSource, VecDeque<AudioFrame>>,
    current_position_ms: u64,
}

impl RecordingMixer {
    pub fn new(config: MixerConfig) -> Self {
        let mut buffers = HashMap::new();
        buffers.insert(FrameSource::Local, VecDeque::new());
        buffers.insert(FrameSource::Remote, VecDeque::new());

        Self {
            config,
            buffers,
            current_position_ms: 0,
        }
    }

    /// Buffer an incoming frame, normalizing it to the recording rate.
    pub fn push(&mut self, mut frame: AudioFrame) {
        if frame.channels != self.config.channels {
            warn!(
                "frame channel count mismatch: expected {}, got {}; dropping frame",
                self.config.channels, frame.channels
            );
            return;
        }

        if frame.sample_rate != self.config.sample_rate {
            frame.samples =
                codec::resample_linear(&frame.samples, frame.sample_rate, self.config.sample_rate);
            frame.sample_rate = self.config.sample_rate;
        }

        if let Some(buffer) = self.buffers.get_mut(&frame.source) {
            debug!(
                "buffered {:?} frame at {}ms ({} samples)",
                frame.source,
                frame.timestamp_ms,
                frame.samples.len()
            );
            buffer.push_back(frame);
        }

        self.drop_stale_frames();
    }

    /// Mix the next chunk from the buffered streams.
    ///
    /// Returns `None` when both buffers are empty.
    pub fn mix_next(&mut self) -> Option<AudioFrame> {
        let mut pending: Vec<AudioFrame> = Vec::with_capacity(2);
        for source in [FrameSource::Local, FrameSource::Remote] {
            if let Some(frame) = self.buffers.get_mut(&source).and_then(VecDeque::pop_front) {
                pending.push(frame);
            }
        }

        let mixed = match pending.len() {
            0 => return None,
            1 => pending.into_iter().next().unwrap(),
            _ => self.mix_frames(&pending),
        };

        self.current_position_ms = mixed.timestamp_ms;
        Some(mixed)
    }

    /// Drain everything still buffered at end of session.
    pub fn drain(&mut self) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        while let Some(frame) = self.mix_next() {
            out.push(frame);
        }
        out
    }

    fn drop_stale_frames(&mut self) {
        let cutoff = self
            .current_position_ms
            .saturating_sub(self.config.max_buffer_delay_ms);

        for (source, buffer) in &mut self.buffers {
            while let Some(frame) = buffer.front() {
                if frame.timestamp_ms < cutoff {
                    warn!(
                        "dropping stale {:?} frame at {}ms (mix position {}ms)",
                        source, frame.timestamp_ms, self.current_position_ms
                    );
                    buffer.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Mix frames by saturating addition, padding the shorter with silence.
    fn mix_frames(&self, frames: &[AudioFrame]) -> AudioFrame {
        let timestamp_ms = frames.iter().map(|f| f.timestamp_ms).min().unwrap_or(0);
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);
        let mut samples = Vec::with_capacity(max_len);

        for i in 0..max_len {
            let sum: i32 = frames
                .iter()
                .map(|f| i32::from(f.samples.get(i).copied().unwrap_or(0)))
                .sum();
            samples.push(sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16);
        }

        AudioFrame {
            samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            timestamp_ms,
            source: FrameSource::Local,
        }
    }
}
