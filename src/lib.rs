pub mod agent;
pub mod analysis;
pub mod audio;
pub mod capture;
pub mod config;
pub mod emotion;
pub mod error;
pub mod http;
pub mod recording;
pub mod session;
pub mod store;
pub mod transcript;

pub use agent::{AgentConnection, AgentConnector, AgentEvent, AgentSettings, NatsAgentConnector};
pub use analysis::{AnalysisResult, Analyst, CallAnalysis, GeminiAnalyst, InterviewAnalysis};
pub use audio::{AudioFrame, DecodedAudio, FrameSource, PlaybackScheduler};
pub use capture::{CaptureConfig, CaptureFactory, CaptureSource, VideoSource, WavCaptureFactory};
pub use config::Config;
pub use emotion::{EmotionSample, ExpressionDetector};
pub use error::{Result, SessionError};
pub use http::{create_router, AppState, SessionDefaults};
pub use recording::{Recorder, RecorderConfig, RecorderHandle, RecordingArtifact};
pub use session::{
    CandidateContext, Session, SessionConfig, SessionDeps, SessionKind, SessionOutcome,
    SessionState, SessionStats,
};
pub use store::{RecruitStore, SupabaseStore};
pub use transcript::{IncomingFragment, Speaker, Transcript, TranscriptEntry};
