//! Persistence collaborator
//!
//! The engine never owns a schema; it hands artifacts and records to an
//! external store through this trait. Only the finalization pipeline and
//! the state machine's status transitions call it.

pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use supabase::{StorageSettings, SupabaseStore};

/// Candidate status values advanced by the engine
pub const STATUS_CALL_COMPLETED: &str = "call_completed";
pub const STATUS_INTERVIEW_COMPLETED: &str = "interview_completed";

/// External persistence operations
#[async_trait]
pub trait RecruitStore: Send + Sync {
    /// Upload a finalized artifact, returning its retrievable URL.
    async fn upload_artifact(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        bucket: &str,
        path: &str,
    ) -> Result<String>;

    /// Insert a record, returning the stored representation.
    async fn create_record(&self, table: &str, fields: Value) -> Result<Value>;

    /// Advance a candidate's pipeline status.
    async fn update_status(&self, candidate_id: &str, status: &str) -> Result<()>;
}
