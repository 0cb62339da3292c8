use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::frame::{CAPTURE_FRAME_SAMPLES, CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE};

/// Which kind of session to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Voice-only scheduling call
    Call,
    /// Voice+video technical interview
    Interview,
}

/// Candidate and job context threaded through instruction assembly,
/// analysis, and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateContext {
    pub candidate_id: String,
    pub candidate_name: String,
    pub job_title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_description: String,
    /// Condensed resume analysis, when one exists
    #[serde(default)]
    pub resume_highlights: Option<String>,
}

/// Configuration for one session attempt
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,
    pub kind: SessionKind,
    pub candidate: CandidateContext,

    /// Outbound capture rate (what the agent expects)
    pub capture_sample_rate: u32,
    /// Samples per outbound frame
    pub frame_samples: usize,
    /// Rate of inbound agent audio and of the mixed recording
    pub playback_sample_rate: u32,

    /// Ceiling on finalization before the session is forced to `Ended`
    pub finalize_timeout: Duration,
    /// Expression sampling interval for interview sessions
    pub emotion_interval: Duration,
}

impl SessionConfig {
    pub fn new(kind: SessionKind, candidate: CandidateContext) -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            kind,
            candidate,
            capture_sample_rate: CAPTURE_SAMPLE_RATE,
            frame_samples: CAPTURE_FRAME_SAMPLES,
            playback_sample_rate: PLAYBACK_SAMPLE_RATE,
            finalize_timeout: Duration::from_secs(60),
            emotion_interval: Duration::from_millis(1500),
        }
    }
}
