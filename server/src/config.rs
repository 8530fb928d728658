// Configuration for the server

use std::path::PathBuf;
use std::time::Duration;

use tts_core::StreamConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub stop_timeout_ms: u64,
    pub static_dir: PathBuf,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            stop_timeout_ms: 2000,
            static_dir: default_static_dir(),
            cors_allowed_origins: None,
        }
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("TTS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let stop_timeout_ms = std::env::var("TTS_STOP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);

        let static_dir = std::env::var("TTS_STATIC_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_static_dir);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            port,
            stop_timeout_ms,
            static_dir,
            cors_allowed_origins,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            stop_timeout: self.stop_timeout(),
        }
    }
}
