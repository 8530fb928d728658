//! Entry point tying the engine, admission and cancellation together.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::admission::{AdmissionResult, SingleFlightGuard};
use crate::cancel::{CancellationController, StopStatus};
use crate::engine::SynthesisEngine;
use crate::handler::RequestHandler;
use crate::registry::StreamRegistry;

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// How long a cancelled session gets to end its stream before the
    /// end-of-stream marker is forced.
    pub stop_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_millis(2000),
        }
    }
}

/// A freshly registered stream and whether synthesis was started for it.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub handler: Arc<RequestHandler>,
    pub admission: AdmissionResult,
}

pub struct TtsService {
    engine: Arc<dyn SynthesisEngine>,
    // Covers speed changes and handler registration so requests cannot
    // interleave them.
    tts_lock: Mutex<()>,
    admission: SingleFlightGuard,
    registry: Arc<StreamRegistry>,
    cancellation: CancellationController,
    config: StreamConfig,
}

impl std::fmt::Debug for TtsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsService")
            .field("engine", &"<SynthesisEngine>")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl TtsService {
    pub fn new(engine: Arc<dyn SynthesisEngine>, config: StreamConfig) -> Self {
        let registry = Arc::new(StreamRegistry::new());
        Self {
            engine,
            tts_lock: Mutex::new(()),
            admission: SingleFlightGuard::new(),
            cancellation: CancellationController::new(Arc::clone(&registry)),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn admission(&self) -> &SingleFlightGuard {
        &self.admission
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register a new stream for `text` and start synthesizing it if no
    /// other start is in flight. A skipped stream is closed right away so its
    /// consumer ends after the header.
    pub fn begin_stream(&self, text: &str, speed: f32) -> anyhow::Result<StreamTicket> {
        let _guard = self.tts_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let info = self.engine.stream_info();
        anyhow::ensure!(info.is_playable(), "Engine reported an unplayable stream format: {info:?}");

        self.engine.set_speed(speed);
        let handler = RequestHandler::new(
            self.engine.create_session(),
            info,
            self.config.stop_timeout,
        );
        self.registry.set_current(Arc::clone(&handler));

        let admission = match self.admission.try_acquire() {
            Some(_permit) => {
                handler
                    .start(text)
                    .context("Failed to start synthesis worker")?;
                info!(stream_id = %handler.id(), speed, "Synthesis started");
                AdmissionResult::Started
            }
            None => {
                warn!(
                    stream_id = %handler.id(),
                    "Another synthesis is starting, closing stream without audio"
                );
                handler.close();
                AdmissionResult::Skipped
            }
        };

        Ok(StreamTicket { handler, admission })
    }

    /// Cancel the most recent stream if it is still speaking.
    pub fn stop_current(&self) -> StopStatus {
        self.cancellation.stop_current()
    }
}
