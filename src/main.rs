use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use voxhire::agent::{AgentSettings, NatsAgentConnector};
use voxhire::analysis::{AnalysisSettings, GeminiAnalyst};
use voxhire::capture::WavCaptureFactory;
use voxhire::store::{StorageSettings, SupabaseStore};
use voxhire::{create_router, AppState, Config, SessionDefaults, SessionDeps};

#[derive(Debug, Parser)]
#[command(name = "voxhire", about = "Real-time voice session engine for recruitment")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/voxhire")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    info!("{} starting", cfg.service.name);

    let wav_path = cfg
        .capture
        .wav_path
        .as_deref()
        .context("capture.wav_path must be set; device capture is provided by embedders")?;

    let deps = SessionDeps {
        capture: Arc::new(WavCaptureFactory::new(wav_path, cfg.capture.realtime)),
        agent: Arc::new(NatsAgentConnector::new(AgentSettings {
            nats_url: cfg.agent.nats_url.clone(),
            model: cfg.agent.model.clone(),
            voice: cfg.agent.voice.clone(),
        })),
        store: Arc::new(SupabaseStore::new(StorageSettings {
            base_url: cfg.storage.base_url.clone(),
            api_key: cfg.storage.api_key.clone(),
        })),
        analyst: Arc::new(GeminiAnalyst::new(AnalysisSettings {
            api_key: cfg.analysis.api_key.clone(),
            model: cfg.analysis.model.clone(),
            base_url: cfg.analysis.base_url.clone(),
        })),
        detector: None,
    };

    let defaults = SessionDefaults {
        finalize_timeout: Duration::from_secs(cfg.session.finalize_timeout_secs),
        emotion_interval: Duration::from_millis(cfg.session.emotion_interval_ms),
    };

    let state = AppState::new(deps, defaults);
    let app = create_router(state);

    let addr = args
        .bind
        .unwrap_or_else(|| format!("{}:{}", cfg.service.http.bind, cfg.service.http.port));
    info!("HTTP server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
