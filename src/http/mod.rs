//! HTTP API for external session control
//!
//! - POST /sessions/start - Start a call or interview session
//! - POST /sessions/:id/stop - Stop a session
//! - GET /sessions/:id/status - Query session state and stats
//! - GET /sessions/:id/transcript - Current merged transcript
//! - GET /sessions/:id/result - Terminal outcome once ended
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionDefaults};
