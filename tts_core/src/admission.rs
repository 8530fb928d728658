use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Outcome of trying to start synthesis for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionResult {
    Started,
    Skipped,
}

impl AdmissionResult {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionResult::Started => "started",
            AdmissionResult::Skipped => "skipped",
        }
    }
}

/// Non-blocking gate allowing one synthesis start at a time.
///
/// Holding the permit only covers spawning the worker; it is dropped right
/// after, not when synthesis completes.
#[derive(Debug)]
pub struct SingleFlightGuard {
    permits: Semaphore,
}

impl Default for SingleFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlightGuard {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
        }
    }

    /// Take the token without waiting. Dropping the permit releases it.
    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.permits.try_acquire().ok()
    }
}
