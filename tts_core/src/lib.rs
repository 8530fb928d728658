//! Streaming orchestration for real-time text-to-speech.
//!
//! A request becomes a [`RequestHandler`] whose synthesis session runs on a
//! worker thread and pushes PCM chunks into a per-request queue. The HTTP
//! layer drains that queue as a WAV byte stream. [`TtsService`] is the single
//! entry point: it owns the shared engine, limits synthesis starts to one at
//! a time and cancels the most recent stream on request.

mod admission;
mod cancel;
mod handler;
mod queue;
mod registry;
mod service;
mod text;
mod wav;

pub mod engine;
pub mod openai;

pub use admission::{AdmissionResult, SingleFlightGuard};
pub use cancel::{CancellationController, StopStatus};
pub use engine::{SampleFormat, StreamInfo, SynthesisEngine, SynthesisSession};
pub use handler::RequestHandler;
pub use queue::{ChunkQueue, Delivery, QueueItem};
pub use registry::StreamRegistry;
pub use service::{StreamConfig, StreamTicket, TtsService};
pub use text::{split_into_pieces, strip_markdown_links};
pub use wav::{build_stream_header, STREAM_HEADER_LEN};
