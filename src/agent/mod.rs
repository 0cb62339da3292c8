pub mod client;
pub mod instruction;
pub mod messages;

pub use client::{AgentConnection, AgentConnector, AgentSettings, NatsAgentConnector};
pub use messages::{AgentEvent, MediaMessage, MediaPayload, MEDIA_MIME_TYPE};
