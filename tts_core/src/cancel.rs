use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::StreamRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopStatus {
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "not speaking")]
    NotSpeaking,
}

/// Stops whatever stream the registry currently points at.
#[derive(Debug, Clone)]
pub struct CancellationController {
    registry: Arc<StreamRegistry>,
}

impl CancellationController {
    pub fn new(registry: Arc<StreamRegistry>) -> Self {
        Self { registry }
    }

    pub fn stop_current(&self) -> StopStatus {
        match self.registry.current() {
            Some(handler) if handler.is_speaking() => {
                handler.cancel();
                StopStatus::Stopped
            }
            _ => StopStatus::NotSpeaking,
        }
    }
}
