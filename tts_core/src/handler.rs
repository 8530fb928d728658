//! Per-request streaming unit.
//!
//! A [`RequestHandler`] binds one synthesis session to one chunk queue. The
//! session runs on a dedicated worker thread and pushes chunks into the
//! queue; the HTTP response drains the queue through
//! [`RequestHandler::stream_chunks`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{StreamInfo, SynthesisSession};
use crate::queue::{ChunkQueue, Delivery, QueueItem};
use crate::text::strip_markdown_links;
use crate::wav::build_stream_header;

pub struct RequestHandler {
    id: Uuid,
    info: StreamInfo,
    session: Box<dyn SynthesisSession>,
    queue: ChunkQueue,
    speaking: AtomicBool,
    stop_timeout: Duration,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("id", &self.id)
            .field("info", &self.info)
            .field("session", &"<SynthesisSession>")
            .field("speaking", &self.is_speaking())
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}

impl RequestHandler {
    pub fn new(
        session: Box<dyn SynthesisSession>,
        info: StreamInfo,
        stop_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            info,
            session,
            queue: ChunkQueue::new(),
            speaking: AtomicBool::new(false),
            stop_timeout,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.info
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Spawn the synthesis worker for `text`.
    ///
    /// Must be called at most once per handler.
    pub fn start(self: &Arc<Self>, text: &str) -> std::io::Result<()> {
        let text = strip_markdown_links(text).into_owned();
        self.speaking.store(true, Ordering::SeqCst);

        let handler = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("tts-synth-{}", self.id.simple()))
            .spawn(move || handler.run_synthesis(&text));

        if let Err(e) = spawned {
            error!(stream_id = %self.id, "Failed to spawn synthesis worker: {e}");
            self.speaking.store(false, Ordering::SeqCst);
            self.queue.fail(format!("failed to spawn synthesis worker: {e}"));
            return Err(e);
        }
        Ok(())
    }

    fn run_synthesis(&self, text: &str) {
        self.session.feed(text);
        info!(stream_id = %self.id, chars = text.chars().count(), "Synthesizing: {text:?}");

        match self.session.play(&mut |chunk| self.on_chunk(chunk)) {
            Ok(()) => self.on_stop(),
            Err(e) => self.on_failure(e),
        }
    }

    /// Producer callback: enqueue one audio chunk.
    pub fn on_chunk(&self, chunk: Bytes) {
        match self.queue.push(chunk) {
            Delivery::Queued => {}
            Delivery::Closed => {
                debug!(stream_id = %self.id, "Dropping chunk produced after stream end");
            }
            Delivery::Disconnected => {
                // Client went away, nobody will hear the rest.
                if self.speaking.swap(false, Ordering::SeqCst) {
                    info!(stream_id = %self.id, "Consumer disconnected, stopping synthesis");
                    self.session.stop();
                }
            }
        }
    }

    /// Producer callback: synthesis finished. Safe to call repeatedly.
    pub fn on_stop(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        if self.queue.close() {
            debug!(stream_id = %self.id, "Synthesis finished");
        }
    }

    fn on_failure(&self, err: anyhow::Error) {
        error!(stream_id = %self.id, "Synthesis failed: {err:#}");
        self.speaking.store(false, Ordering::SeqCst);
        self.queue.fail(format!("{err:#}"));
    }

    /// End the stream without ever starting a producer.
    pub fn close(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        self.queue.close();
    }

    /// Stop synthesis and make sure the consumer is released.
    ///
    /// The session is asked to stop; if it has not terminated the stream
    /// within the stop timeout, the end-of-stream marker is injected.
    pub fn cancel(self: &Arc<Self>) {
        info!(stream_id = %self.id, "Stopping synthesis");
        self.session.stop();
        self.speaking.store(false, Ordering::SeqCst);

        let handler = Arc::clone(self);
        let watchdog = move || {
            if !handler.queue.wait_closed(handler.stop_timeout) {
                warn!(
                    stream_id = %handler.id,
                    timeout_ms = handler.stop_timeout.as_millis() as u64,
                    "Synthesis did not acknowledge stop, closing stream"
                );
                handler.queue.close();
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(watchdog);
            }
            Err(_) => {
                // Called from outside the runtime, e.g. a blocking caller.
                let spawned = thread::Builder::new()
                    .name(format!("tts-stop-{}", self.id.simple()))
                    .spawn(watchdog);
                if let Err(e) = spawned {
                    warn!(stream_id = %self.id, "Failed to spawn stop watchdog ({e}), closing stream now");
                    self.queue.close();
                }
            }
        }
    }

    /// Consume the queue as a stream of response body buffers.
    ///
    /// Yields the WAV header first when `emit_header` is set, then every
    /// chunk in production order, and ends at the end-of-stream marker. A
    /// synthesis failure truncates the stream. Only the first call gets the
    /// audio; later calls yield an empty stream.
    pub fn stream_chunks(&self, emit_header: bool) -> impl Stream<Item = Bytes> + Send + 'static {
        let receiver = self.queue.take_receiver();
        let header = emit_header.then(|| {
            Bytes::from(build_stream_header(
                self.info.channels,
                self.info.format.sample_width(),
                self.info.sample_rate,
            ))
        });
        let id = self.id;

        async_stream::stream! {
            match receiver {
                None => {
                    warn!(stream_id = %id, "Audio stream was already consumed");
                }
                Some(mut rx) => {
                    if let Some(header) = header {
                        debug!(stream_id = %id, "Sending wave header");
                        yield header;
                    }
                    while let Some(item) = rx.recv().await {
                        match item {
                            QueueItem::Chunk(chunk) => {
                                yield chunk;
                            }
                            QueueItem::End => {
                                debug!(stream_id = %id, "Terminating stream");
                                break;
                            }
                            QueueItem::Failed(reason) => {
                                error!(stream_id = %id, "Error during streaming: {reason}");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}
