use std::sync::{Arc, Mutex, PoisonError};

use crate::handler::RequestHandler;

/// Slot holding the most recently started stream.
///
/// Only the latest request can be found here; a handler that gets replaced
/// keeps streaming but can no longer be cancelled.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    current: Mutex<Option<Arc<RequestHandler>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` as current and return the one it replaced.
    pub fn set_current(&self, handler: Arc<RequestHandler>) -> Option<Arc<RequestHandler>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handler)
    }

    pub fn current(&self) -> Option<Arc<RequestHandler>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
