use std::path::PathBuf;

use async_trait::async_trait;
use hound::WavReader;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::frame::{AudioFrame, CAPTURE_FRAME_SAMPLES, CAPTURE_SAMPLE_RATE};
use crate::capture::pipeline::FrameAssembler;
use crate::error::{Result, SessionError};

/// Configuration for a capture source
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate frames are delivered at
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per delivered frame
    pub frame_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: CAPTURE_SAMPLE_RATE,
            channels: 1,
            frame_samples: CAPTURE_FRAME_SAMPLES,
        }
    }
}

/// Audio capture source
///
/// `start` acquires the underlying device; an access refusal surfaces as
/// [`SessionError::PermissionDenied`]. Frames arrive on the returned
/// channel until the source is stopped or the input ends.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    async fn stop(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Video capture source for interview sessions
///
/// Delivers device-encoded video chunks (the engine does not transcode
/// video); the chunk stream concatenates into the recording artifact.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>>;

    async fn stop(&mut self) -> Result<()>;
}

/// Creates capture sources for a session attempt.
///
/// Each attempt gets fresh sources so a retry after an error never reuses
/// half-released device handles.
pub trait CaptureFactory: Send + Sync {
    fn create_audio(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureSource>>;

    /// `None` when this deployment has no camera to offer; interview
    /// sessions then record audio only.
    fn create_video(&self) -> Result<Option<Box<dyn VideoSource>>>;
}

/// Capture source that streams a WAV file as capture frames.
///
/// Used for batch runs and tests. With `realtime` set, frames are paced at
/// their natural rate instead of delivered as fast as possible.
pub struct WavFileSource {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig, realtime: bool) -> Self {
        Self {
            path: path.into(),
            config,
            realtime,
            task: None,
        }
    }
}

#[async_trait]
impl CaptureSource for WavFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            SessionError::Audio(format!("failed to open {}: {e}", self.path.display()))
        })?;

        let spec = reader.spec();
        if spec.channels != self.config.channels {
            return Err(SessionError::Audio(format!(
                "expected {} channel(s), {} has {}",
                self.config.channels,
                self.path.display(),
                spec.channels
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SessionError::Audio(format!("failed to read samples: {e}")))?;

        info!(
            path = %self.path.display(),
            sample_rate = spec.sample_rate,
            samples = samples.len(),
            "wav capture source started"
        );

        let (tx, rx) = mpsc::channel(32);
        let config = self.config.clone();
        let source_rate = spec.sample_rate;
        let realtime = self.realtime;

        let task = tokio::spawn(async move {
            let normalized = if source_rate == config.sample_rate {
                samples
            } else {
                crate::audio::codec::resample_linear(&samples, source_rate, config.sample_rate)
            };

            let mut assembler = FrameAssembler::new(config.sample_rate, config.frame_samples);
            let mut frames = assembler.push(&normalized);
            if let Some(last) = assembler.flush() {
                frames.push(last);
            }

            let frame_secs =
                config.frame_samples as f64 / f64::from(config.sample_rate);
            for frame in frames {
                if realtime {
                    tokio::time::sleep(std::time::Duration::from_secs_f64(frame_secs)).await;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Factory producing [`WavFileSource`] audio capture and no video
pub struct WavCaptureFactory {
    path: PathBuf,
    realtime: bool,
}

impl WavCaptureFactory {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            realtime,
        }
    }
}

impl CaptureFactory for WavCaptureFactory {
    fn create_audio(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureSource>> {
        Ok(Box::new(WavFileSource::new(
            self.path.clone(),
            config.clone(),
            self.realtime,
        )))
    }

    fn create_video(&self) -> Result<Option<Box<dyn VideoSource>>> {
        warn!("no video source available; interview sessions will record audio only");
        Ok(None)
    }
}
