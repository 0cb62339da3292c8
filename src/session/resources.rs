//! Owned resource bundle for one session attempt
//!
//! Everything `start()` acquires lives in this one structure, and the one
//! `release` routine — consumed by value, so it cannot run twice — is
//! invoked from every terminal transition. No other component keeps a
//! device or transport handle past the event that uses it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::agent::client::AgentConnection;
use crate::capture::source::{CaptureSource, VideoSource};
use crate::emotion::EmotionSampler;

pub struct SessionResources {
    pub audio: Box<dyn CaptureSource>,
    pub video: Option<Box<dyn VideoSource>>,
    pub agent: Option<Box<dyn AgentConnection>>,
    pub emotion: Option<EmotionSampler>,
    /// Gates capture forwarding and emotion sampling
    pub live: Arc<AtomicBool>,
    /// Forwarder tasks feeding the session event channel
    pub pumps: Vec<JoinHandle<()>>,
}

impl SessionResources {
    pub fn new(audio: Box<dyn CaptureSource>, video: Option<Box<dyn VideoSource>>) -> Self {
        Self {
            audio,
            video,
            agent: None,
            emotion: None,
            live: Arc::new(AtomicBool::new(false)),
            pumps: Vec::new(),
        }
    }

    /// Halt local input: capture devices stop, forwarder tasks end, and
    /// their recording-tap senders drop so the recorder can flush.
    pub async fn halt_input(&mut self) {
        self.live.store(false, Ordering::SeqCst);

        if let Err(e) = self.audio.stop().await {
            warn!("audio capture stop failed: {e}");
        }
        if let Some(video) = &mut self.video {
            if let Err(e) = video.stop().await {
                warn!("video capture stop failed: {e}");
            }
        }
        if let Some(emotion) = self.emotion.take() {
            emotion.stop();
        }

        for pump in self.pumps.drain(..) {
            pump.abort();
            let _ = pump.await;
        }

        debug!("session input halted");
    }

    /// Release every owned resource. Consumes the bundle; every exit path
    /// of a session attempt funnels through here exactly once.
    pub async fn release(mut self) {
        self.halt_input().await;

        if let Some(mut agent) = self.agent.take() {
            if let Err(e) = agent.close().await {
                warn!("agent close failed: {e}");
            }
        }

        debug!("session resources released");
    }
}
