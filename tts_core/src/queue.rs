use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Item carried from the synthesis worker to the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Chunk(Bytes),
    /// Synthesis failed; the stream ends after logging the reason.
    Failed(String),
    /// End-of-stream marker.
    End,
}

/// Result of pushing a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue was already terminated; the chunk was dropped.
    Closed,
    /// The consumer is gone; nobody will read the chunk.
    Disconnected,
}

/// Unbounded FIFO between one producer and one consumer.
///
/// Exactly one terminal item ([`QueueItem::End`] or [`QueueItem::Failed`])
/// is ever enqueued, and nothing is enqueued after it.
#[derive(Debug)]
pub struct ChunkQueue {
    tx: UnboundedSender<QueueItem>,
    rx: Mutex<Option<UnboundedReceiver<QueueItem>>>,
    // Held while sending so that pushes and termination never interleave.
    closed: Mutex<bool>,
    closed_cv: Condvar,
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            closed: Mutex::new(false),
            closed_cv: Condvar::new(),
        }
    }

    pub fn push(&self, chunk: Bytes) -> Delivery {
        let closed = self.lock_closed();
        if *closed {
            return Delivery::Closed;
        }
        match self.tx.send(QueueItem::Chunk(chunk)) {
            Ok(()) => Delivery::Queued,
            Err(_) => Delivery::Disconnected,
        }
    }

    /// Enqueue the end-of-stream marker. Returns `false` if the queue was
    /// already terminated.
    pub fn close(&self) -> bool {
        self.terminate(QueueItem::End)
    }

    /// Terminate the queue with a failure. Returns `false` if the queue was
    /// already terminated.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.terminate(QueueItem::Failed(reason.into()))
    }

    pub fn is_closed(&self) -> bool {
        *self.lock_closed()
    }

    /// Wait until the queue is terminated or `timeout` elapses.
    /// Returns whether the queue is terminated.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut closed = self.lock_closed();
        while !*closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            closed = self
                .closed_cv
                .wait_timeout(closed, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }

    /// Hand out the consumer side. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<UnboundedReceiver<QueueItem>> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn terminate(&self, item: QueueItem) -> bool {
        let mut closed = self.lock_closed();
        if *closed {
            return false;
        }
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.tx.send(item);
        *closed = true;
        self.closed_cv.notify_all();
        true
    }

    fn lock_closed(&self) -> MutexGuard<'_, bool> {
        self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
