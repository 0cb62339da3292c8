use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::messages::AgentEvent;
use crate::analysis::AnalysisResult;
use crate::audio::frame::AudioFrame;
use crate::session::config::SessionKind;

/// Lifecycle states of a session attempt
///
/// `Ended` and `Error` are terminal for the attempt; a retry starts a
/// fresh attempt from `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Analyzing,
    Ended,
    Error,
}

/// Everything the run loop reacts to, funneled through one channel so
/// events are consumed in a single, ordered stream.
#[derive(Debug)]
pub enum SessionEvent {
    /// A capture frame ready for the transport
    CaptureFrame(AudioFrame),
    /// The capture stream ended on its own
    CaptureClosed,
    /// Inbound event from the remote agent
    Agent(AgentEvent),
    /// Explicit stop request
    Stop,
}

/// Terminal result of a session, produced exactly once
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub kind: SessionKind,
    pub analysis: Option<AnalysisResult>,
    pub artifact_url: Option<String>,
    pub duration_secs: u64,
    /// Failures encountered on the way to this outcome
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl SessionOutcome {
    pub fn new(session_id: &str, kind: SessionKind) -> Self {
        Self {
            session_id: session_id.to_string(),
            kind,
            analysis: None,
            artifact_url: None,
            duration_secs: 0,
            errors: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Point-in-time statistics for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,
    pub kind: SessionKind,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub transcript_entries: usize,
    pub frames_sent: usize,
    pub audio_chunks_played: usize,
    pub emotion_samples: usize,
    pub error: Option<String>,
}
