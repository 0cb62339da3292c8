use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::session::{Session, SessionDeps};

/// Engine-level defaults applied to every new session
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub finalize_timeout: Duration,
    pub emotion_interval: Duration,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            finalize_timeout: Duration::from_secs(60),
            emotion_interval: Duration::from_millis(1500),
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live and finished sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    pub deps: SessionDeps,
    pub defaults: SessionDefaults,
}

impl AppState {
    pub fn new(deps: SessionDeps, defaults: SessionDefaults) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            defaults,
        }
    }
}
