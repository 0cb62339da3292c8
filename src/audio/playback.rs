//! Playback scheduling for inbound agent audio
//!
//! Agent audio chunks arrive with network jitter but must play gaplessly
//! and in order. The scheduler keeps a single cursor: each chunk is
//! scheduled to start at `max(cursor, now)` and the cursor advances by the
//! chunk's duration, so chunks never overlap and are never scheduled in
//! the past. On a barge-in ("interrupted") signal everything pending is
//! stopped and the cursor resets to zero so the next chunk starts
//! immediately.
//!
//! Every scheduled chunk is also tapped into the recording sink, stamped
//! at its scheduled start, so the agent's side of the conversation lands
//! in the artifact.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::audio::codec;
use crate::audio::frame::{AudioFrame, FrameSource};

/// Output clock for playback scheduling, in seconds since session start.
///
/// A trait so tests can drive time manually.
pub trait OutputClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic wall-clock implementation used in production
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// A decoded agent audio chunk ready for scheduling
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        codec::duration_secs(self.samples.len(), self.sample_rate)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledChunk {
    start: f64,
    duration: f64,
}

/// Schedules decoded agent audio for gapless, non-overlapping output
pub struct PlaybackScheduler {
    clock: Box<dyn OutputClock>,
    cursor: f64,
    active: Vec<ScheduledChunk>,
    tap: mpsc::Sender<AudioFrame>,
}

impl PlaybackScheduler {
    pub fn new(clock: Box<dyn OutputClock>, tap: mpsc::Sender<AudioFrame>) -> Self {
        Self {
            clock,
            cursor: 0.0,
            active: Vec::new(),
            tap,
        }
    }

    /// Schedule a chunk for playback and tap it into the recording sink.
    ///
    /// Returns the scheduled start time in seconds.
    pub async fn enqueue(&mut self, audio: DecodedAudio) -> f64 {
        self.reap();

        self.cursor = self.cursor.max(self.clock.now());
        let start = self.cursor;
        let duration = audio.duration_secs();

        let frame = AudioFrame {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            channels: 1,
            timestamp_ms: (start * 1000.0) as u64,
            source: FrameSource::Remote,
        };
        if let Err(e) = self.tap.send(frame).await {
            warn!("recording sink unavailable, agent audio not recorded: {e}");
        }

        self.active.push(ScheduledChunk { start, duration });
        self.cursor += duration;

        debug!(
            start,
            duration,
            pending = self.active.len(),
            "scheduled agent audio chunk"
        );
        start
    }

    /// Barge-in: stop every pending chunk and reset the cursor so the next
    /// chunk starts immediately instead of at the stale cursor.
    pub fn interrupt(&mut self) {
        let stopped = self.active.len();
        self.active.clear();
        self.cursor = 0.0;
        debug!(stopped, "playback interrupted");
    }

    /// Remove chunks that completed naturally.
    fn reap(&mut self) {
        let now = self.clock.now();
        self.active.retain(|c| c.start + c.duration > now);
    }

    /// Number of chunks currently scheduled or playing.
    pub fn active_len(&mut self) -> usize {
        self.reap();
        self.active.len()
    }

    /// Current cursor position in seconds.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }
}
