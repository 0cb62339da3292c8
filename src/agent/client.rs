//! Duplex transport to the remote conversational agent
//!
//! Outbound capture media is published on `agent.media.<session>`; the
//! agent service publishes its events on `agent.events.<session>`. The
//! connector seam keeps the session state machine independent of the
//! broker so tests can script the remote side.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::messages::{AgentEvent, CloseMessage, MediaMessage, OpenMessage};
use crate::error::{Result, SessionError};

/// Live outbound half of an agent session
#[async_trait]
pub trait AgentConnection: Send {
    /// Publish one realtime media message.
    async fn send_media(&mut self, message: MediaMessage) -> Result<()>;

    /// Close the session. Idempotent at the transport level.
    async fn close(&mut self) -> Result<()>;
}

/// Opens duplex agent sessions
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Open a session. Returns the outbound connection and the inbound
    /// event stream; event-stream exhaustion means the transport closed.
    async fn connect(
        &self,
        session_id: &str,
        system_instruction: &str,
    ) -> Result<(Box<dyn AgentConnection>, mpsc::Receiver<AgentEvent>)>;
}

/// Settings for the NATS agent transport
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub nats_url: String,
    pub model: String,
    pub voice: String,
}

/// NATS-backed agent connector
pub struct NatsAgentConnector {
    settings: AgentSettings,
}

impl NatsAgentConnector {
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl AgentConnector for NatsAgentConnector {
    async fn connect(
        &self,
        session_id: &str,
        system_instruction: &str,
    ) -> Result<(Box<dyn AgentConnection>, mpsc::Receiver<AgentEvent>)> {
        info!("connecting to agent transport at {}", self.settings.nats_url);

        let client = async_nats::connect(&self.settings.nats_url)
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;

        let events_subject = format!("agent.events.{session_id}");
        let mut subscriber = client
            .subscribe(events_subject.clone())
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;

        let open = OpenMessage {
            session_id: session_id.to_string(),
            model: self.settings.model.clone(),
            voice: self.settings.voice.clone(),
            system_instruction: system_instruction.to_string(),
        };
        let payload = serde_json::to_vec(&open)?;
        client
            .publish(format!("agent.control.{session_id}"), payload.into())
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;

        info!(session_id, "agent session opened");

        let (events_tx, events_rx) = mpsc::channel(256);
        let forward_task = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                match serde_json::from_slice::<AgentEvent>(&message.payload) {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("failed to parse agent event: {e}");
                    }
                }
            }
            // subscription ended: surface it as a transport close
            let _ = events_tx.send(AgentEvent::Closed).await;
        });

        let connection = NatsAgentConnection {
            client,
            session_id: session_id.to_string(),
            media_subject: format!("agent.media.{session_id}"),
            forward_task: Some(forward_task),
        };

        Ok((Box::new(connection), events_rx))
    }
}

struct NatsAgentConnection {
    client: async_nats::Client,
    session_id: String,
    media_subject: String,
    forward_task: Option<JoinHandle<()>>,
}

#[async_trait]
impl AgentConnection for NatsAgentConnection {
    async fn send_media(&mut self, message: MediaMessage) -> Result<()> {
        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(self.media_subject.clone(), payload.into())
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.forward_task.take() {
            let close = CloseMessage {
                session_id: self.session_id.clone(),
            };
            if let Ok(payload) = serde_json::to_vec(&close) {
                if let Err(e) = self
                    .client
                    .publish(format!("agent.control.{}", self.session_id), payload.into())
                    .await
                {
                    warn!("failed to publish close notice: {e}");
                }
            }
            task.abort();
            info!(session_id = %self.session_id, "agent session closed");
        }
        Ok(())
    }
}
