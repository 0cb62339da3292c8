//! Fixed-cadence framing of the raw capture stream
//!
//! Device layers deliver sample blocks of whatever size their buffers
//! produce. The assembler re-chunks them into exact fixed-size frames
//! (4096 samples ≈ 256 ms at 16 kHz) so every outbound transport message
//! carries one frame. Timestamps are derived from the running sample
//! count, not wall time, so framing is deterministic.

use crate::audio::frame::{AudioFrame, FrameSource};

/// Re-chunks arbitrary-size sample blocks into fixed-size capture frames
#[derive(Debug)]
pub struct FrameAssembler {
    sample_rate: u32,
    frame_samples: usize,
    pending: Vec<i16>,
    emitted_samples: u64,
}

impl FrameAssembler {
    pub fn new(sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            sample_rate,
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
            emitted_samples: 0,
        }
    }

    /// Feed a block of raw samples; returns every full frame now ready.
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let samples = std::mem::replace(&mut self.pending, rest);
            frames.push(self.frame_from(samples));
        }
        frames
    }

    /// Emit whatever is left as a short final frame.
    pub fn flush(&mut self) -> Option<AudioFrame> {
        if self.pending.is_empty() {
            return None;
        }
        let samples = std::mem::take(&mut self.pending);
        Some(self.frame_from(samples))
    }

    fn frame_from(&mut self, samples: Vec<i16>) -> AudioFrame {
        let timestamp_ms = self.emitted_samples * 1000 / u64::from(self.sample_rate);
        self.emitted_samples += samples.len() as u64;

        AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
            timestamp_ms,
            source: FrameSource::Local,
        }
    }
}
