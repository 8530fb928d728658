use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use server::config::ServerConfig;
use server::{build_router, AppState};
use tts_core::openai::{OpenAiConfig, OpenAiEngine};
use tts_core::TtsService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting TTS streaming server...");

    let config = ServerConfig::from_env();

    info!("Initializing TTS engine");
    let engine_config = OpenAiConfig::from_env().context("TTS engine unavailable")?;
    info!(
        model = %engine_config.model,
        voice = %engine_config.voice,
        "Using OpenAI speech engine"
    );
    let engine = Arc::new(OpenAiEngine::new(engine_config));
    let tts = Arc::new(TtsService::new(engine, config.stream_config()));

    info!(
        "Server configuration loaded: port={}, stop_timeout={}ms, static_dir={}",
        config.port,
        config.stop_timeout_ms,
        config.static_dir.display()
    );

    let app = build_router(AppState {
        tts,
        config: config.clone(),
    });

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different TTS_PORT.")
    })?;

    info!("Server ready, listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
