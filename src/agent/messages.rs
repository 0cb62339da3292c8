use serde::{Deserialize, Serialize};

use crate::audio::codec;
use crate::audio::frame::AudioFrame;
use crate::transcript::Speaker;

/// Mime type declared on outbound capture media
pub const MEDIA_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Encoded media payload carried in an outbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded little-endian PCM
    pub data: String,
    pub mime_type: String,
    pub sample_rate: u32,
}

/// Outbound realtime media message published on the agent channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMessage {
    pub session_id: String,
    pub sequence: u32,
    pub media: MediaPayload,
    /// RFC3339 timestamp
    pub timestamp: String,
}

impl MediaMessage {
    pub fn from_frame(session_id: &str, sequence: u32, frame: &AudioFrame) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            media: MediaPayload {
                data: codec::encode_pcm(&frame.samples),
                mime_type: MEDIA_MIME_TYPE.to_string(),
                sample_rate: frame.sample_rate,
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Session-open request published on the agent control channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMessage {
    pub session_id: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

/// Session-close notice published on the agent control channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseMessage {
    pub session_id: String,
}

/// Inbound event from the remote conversational agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental transcription of either side of the conversation
    Transcript {
        speaker: Speaker,
        text: String,
        #[serde(rename = "final", default)]
        is_final: bool,
    },
    /// Base64 PCM audio chunk of agent speech (24 kHz mono)
    Audio { data: String },
    /// The agent finished a conversational turn
    TurnComplete,
    /// Barge-in: the human started speaking over pending agent audio
    Interrupted,
    /// The agent closed the session
    Closed,
    /// Transport-level error
    Error { message: String },
}
