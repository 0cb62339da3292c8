//! Supabase-backed persistence store

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::RecruitStore;
use crate::error::{Result, SessionError};

/// Settings for the persistence store
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    pub api_key: String,
}

/// Talks to Supabase storage and REST endpoints
pub struct SupabaseStore {
    client: Client,
    settings: StorageSettings,
}

impl SupabaseStore {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.settings.api_key)
    }
}

#[async_trait]
impl RecruitStore for SupabaseStore {
    async fn upload_artifact(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        bucket: &str,
        path: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{bucket}/{path}",
            self.settings.base_url
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header("apikey", &self.settings.api_key)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_str(content_type)
                    .unwrap_or(HeaderValue::from_static("application/octet-stream")),
            )
            .body(bytes)
            .send()
            .await
            .map_err(|e| SessionError::UploadFailed(format!("upload request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::UploadFailed(format!(
                "upload rejected: {status} - {body}"
            )));
        }

        let public_url = format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.settings.base_url
        );
        debug!(%public_url, "artifact uploaded");
        Ok(public_url)
    }

    async fn create_record(&self, table: &str, fields: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/{table}", self.settings.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header("apikey", &self.settings.api_key)
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await
            .map_err(|e| SessionError::UploadFailed(format!("insert request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::UploadFailed(format!(
                "insert into {table} rejected: {status} - {body}"
            )));
        }

        let mut rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| SessionError::UploadFailed(format!("unreadable insert response: {e}")))?;

        rows.pop()
            .ok_or_else(|| SessionError::UploadFailed(format!("insert into {table} returned no row")))
    }

    async fn update_status(&self, candidate_id: &str, status: &str) -> Result<()> {
        let url = format!(
            "{}/rest/v1/candidates?id=eq.{candidate_id}",
            self.settings.base_url
        );

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header("apikey", &self.settings.api_key)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|e| SessionError::UploadFailed(format!("status update failed: {e}")))?;

        if !response.status().is_success() {
            let status_code = response.status();
            return Err(SessionError::UploadFailed(format!(
                "status update rejected: {status_code}"
            )));
        }

        debug!(candidate_id, status, "candidate status updated");
        Ok(())
    }
}
