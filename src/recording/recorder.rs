//! Recording task
//!
//! The recorder owns the mixing sink for the whole session: the capture
//! pump taps local frames in, the playback scheduler taps agent audio in,
//! and (for interviews) the video source taps encoded chunks in. Closing
//! every tap makes the task flush and finalize; awaiting its join handle
//! is the flush acknowledgment the finalization pipeline waits on before
//! assembling the artifact.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::audio::frame::AudioFrame;
use crate::audio::mixer::{MixerConfig, RecordingMixer};
use crate::error::{Result, SessionError};

/// Content type of call artifacts (engine-mixed WAV)
pub const AUDIO_CONTENT_TYPE: &str = "audio/wav";
/// Content type of interview artifacts (device-encoded chunk stream)
pub const VIDEO_CONTENT_TYPE: &str = "video/webm";

/// The finalized, immutable recording of one session
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub media: Vec<u8>,
    pub content_type: &'static str,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    /// Mixed audio samples that went into the artifact (0 for pure-video)
    pub sample_count: usize,
}

/// Configuration for the recorder task
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Sample rate of the mixed recording
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::audio::frame::PLAYBACK_SAMPLE_RATE,
            channels: 1,
        }
    }
}

/// Handle to the running recorder task
pub struct RecorderHandle {
    audio_tx: mpsc::Sender<AudioFrame>,
    video_tx: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<Result<RecordingArtifact>>,
}

impl RecorderHandle {
    /// A sender for tapping audio frames into the recording.
    pub fn audio_tap(&self) -> mpsc::Sender<AudioFrame> {
        self.audio_tx.clone()
    }

    /// A sender for tapping encoded video chunks into the recording.
    pub fn video_tap(&self) -> mpsc::Sender<Vec<u8>> {
        self.video_tx.clone()
    }

    /// Wait for the recorder to flush and assemble the artifact.
    ///
    /// Drops this handle's own senders first; the task finishes once every
    /// outstanding tap clone has been dropped as well.
    pub async fn finish(self) -> Result<RecordingArtifact> {
        drop(self.audio_tx);
        drop(self.video_tx);
        self.task
            .await
            .map_err(|e| SessionError::Audio(format!("recorder task failed: {e}")))?
    }
}

/// Spawns the recording task
pub struct Recorder;

impl Recorder {
    pub fn spawn(config: RecorderConfig) -> RecorderHandle {
        let (audio_tx, audio_rx) = mpsc::channel::<AudioFrame>(256);
        let (video_tx, video_rx) = mpsc::channel::<Vec<u8>>(64);

        let task = tokio::spawn(run(config, audio_rx, video_rx));

        RecorderHandle {
            audio_tx,
            video_tx,
            task,
        }
    }
}

async fn run(
    config: RecorderConfig,
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    mut video_rx: mpsc::Receiver<Vec<u8>>,
) -> Result<RecordingArtifact> {
    let started_at = Utc::now();
    let mut mixer = RecordingMixer::new(MixerConfig {
        sample_rate: config.sample_rate,
        channels: config.channels,
        ..MixerConfig::default()
    });
    let mut samples: Vec<i16> = Vec::new();
    let mut video_chunks: Vec<Vec<u8>> = Vec::new();

    let mut audio_open = true;
    let mut video_open = true;
    while audio_open || video_open {
        tokio::select! {
            frame = audio_rx.recv(), if audio_open => match frame {
                Some(frame) => {
                    mixer.push(frame);
                    while let Some(mixed) = mixer.mix_next() {
                        samples.extend_from_slice(&mixed.samples);
                    }
                }
                None => audio_open = false,
            },
            chunk = video_rx.recv(), if video_open => match chunk {
                Some(chunk) => video_chunks.push(chunk),
                None => video_open = false,
            },
        }
    }

    for mixed in mixer.drain() {
        samples.extend_from_slice(&mixed.samples);
    }

    let ended_at = Utc::now();
    let duration_secs = (ended_at - started_at).num_seconds().max(0) as u64;

    if samples.is_empty() && video_chunks.is_empty() {
        warn!("recording finished with no media");
    }

    // interviews get the device-encoded video stream; everything else gets
    // the mixed WAV
    let (media, content_type) = if video_chunks.is_empty() {
        (
            encode_wav(&samples, config.sample_rate, config.channels)?,
            AUDIO_CONTENT_TYPE,
        )
    } else {
        (video_chunks.concat(), VIDEO_CONTENT_TYPE)
    };

    info!(
        bytes = media.len(),
        content_type,
        duration_secs,
        samples = samples.len(),
        "recording artifact assembled"
    );

    Ok(RecordingArtifact {
        media,
        content_type,
        started_at,
        ended_at,
        duration_secs,
        sample_count: samples.len(),
    })
}

/// Encode mixed samples into a single in-memory WAV blob.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SessionError::Audio(format!("failed to create WAV writer: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| SessionError::Audio(format!("failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| SessionError::Audio(format!("failed to finalize WAV: {e}")))?;
    }

    Ok(cursor.into_inner())
}
