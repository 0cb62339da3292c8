use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub nats_url: String,
    pub model: String,
    pub voice: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Finalization ceiling in seconds
    pub finalize_timeout_secs: u64,
    /// Expression sampling interval in milliseconds
    pub emotion_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            finalize_timeout_secs: 60,
            emotion_interval_ms: 1500,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureSettings {
    /// WAV file to stream as the capture source (batch/demo deployments);
    /// embedders provide device capture through the library seams instead
    pub wav_path: Option<String>,
    /// Pace WAV frames at their natural rate
    #[serde(default)]
    pub realtime: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
