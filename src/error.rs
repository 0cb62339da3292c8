//! Error types for the session engine

use std::time::Duration;

use thiserror::Error;

/// Result type alias for session-engine operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while running a session
///
/// Every device, transport, and collaborator failure is caught at the
/// boundary where it happens and mapped to one of these kinds; none of them
/// propagate as panics.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Capture device access was refused. Terminal; the caller may retry
    /// with a fresh session attempt.
    #[error("capture device access denied: {0}")]
    PermissionDenied(String),

    /// The remote agent session could not be opened. Terminal, retryable.
    #[error("could not open agent session: {0}")]
    ConnectFailed(String),

    /// The duplex transport closed or errored mid-session. Routes through
    /// normal finalization rather than a silent retry.
    #[error("agent transport error: {0}")]
    Transport(String),

    /// Finalization did not complete within the bounded ceiling; the
    /// session is forced to `Ended` with a degraded outcome.
    #[error("finalization did not complete within {0:?}")]
    FinalizeTimeout(Duration),

    /// A persistence operation (artifact upload, record insert, status
    /// update) failed. Logged; finalization still completes.
    #[error("persistence operation failed: {0}")]
    UploadFailed(String),

    /// The analysis collaborator failed or returned an empty/malformed
    /// response. Logged; finalization still completes.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// Audio processing error (codec, recorder, scheduler)
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Stable machine-readable kind, used in outcome payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::ConnectFailed(_) => "connect_failed",
            Self::Transport(_) => "transport_error",
            Self::FinalizeTimeout(_) => "finalization_timeout",
            Self::UploadFailed(_) => "upload_failed",
            Self::AnalysisFailed(_) => "analysis_failed",
            Self::Audio(_) => "audio_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}
