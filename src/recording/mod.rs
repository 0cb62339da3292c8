//! Recording and finalization pipeline
//!
//! The recorder task accumulates the mixed conversation while the session
//! runs; finalization turns it into a durable artifact, an analysis
//! result, and persisted records, always terminating even when sub-steps
//! fail.

pub mod finalize;
pub mod recorder;

pub use finalize::FinalizeRequest;
pub use recorder::{
    Recorder, RecorderConfig, RecorderHandle, RecordingArtifact, AUDIO_CONTENT_TYPE,
    VIDEO_CONTENT_TYPE,
};
