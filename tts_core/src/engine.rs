//! Boundary to the speech synthesis engine.
//!
//! The orchestration code only ever talks to an engine through these two
//! traits. One engine instance is shared by every request; each request gets
//! its own [`SynthesisSession`].

use bytes::Bytes;

/// Sample encoding reported by an engine. Streams are framed as integer
/// PCM, so only integer formats exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Int16,
}

impl SampleFormat {
    /// Bytes per sample of one channel.
    pub fn sample_width(self) -> u16 {
        match self {
            SampleFormat::Int16 => 2,
        }
    }
}

/// Audio format of the chunks a session will produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl StreamInfo {
    /// Whether a stream in this format can be framed at all.
    pub fn is_playable(&self) -> bool {
        self.channels > 0 && self.sample_rate > 0
    }
}

pub trait SynthesisEngine: Send + Sync {
    /// Set the reading speed used by sessions created after this call.
    fn set_speed(&self, speed: f32);

    fn stream_info(&self) -> StreamInfo;

    fn create_session(&self) -> Box<dyn SynthesisSession>;
}

/// One synthesis run bound to a single request.
pub trait SynthesisSession: Send + Sync {
    /// Queue text for synthesis.
    fn feed(&self, text: &str);

    /// Synthesize the fed text, handing every audio chunk to `on_chunk` in
    /// playback order.
    ///
    /// Blocks the calling thread until synthesis has finished or [`stop`]
    /// was honored. Returning (with either result) is the completion signal.
    ///
    /// [`stop`]: SynthesisSession::stop
    fn play(&self, on_chunk: &mut dyn FnMut(Bytes)) -> anyhow::Result<()>;

    /// Ask a running [`play`](SynthesisSession::play) to return promptly.
    /// May be called from any thread, any number of times.
    fn stop(&self);
}
