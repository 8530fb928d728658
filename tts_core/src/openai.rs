//! Synthesis engine backed by OpenAI's speech endpoint with raw PCM output.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::engine::{SampleFormat, StreamInfo, SynthesisEngine, SynthesisSession};
use crate::text::split_into_pieces;

/// OpenAI returns 24 kHz mono signed 16-bit little-endian PCM.
pub const OPENAI_PCM_SAMPLE_RATE: u32 = 24_000;

const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;
const READ_CHUNK_SIZE: usize = 4096;
/// Longest input the speech endpoint accepts in one request.
const MAX_INPUT_CHARS: usize = 4096;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .context("OPENAI_API_KEY must be set to use the OpenAI speech engine")?;

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = std::env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "tts-1".into());
        let voice = std::env::var("OPENAI_TTS_VOICE").unwrap_or_else(|_| "nova".into());

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            voice,
        })
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }
}

#[derive(Debug)]
pub struct OpenAiEngine {
    config: Arc<OpenAiConfig>,
    speed: Mutex<f32>,
}

impl OpenAiEngine {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config: Arc::new(config),
            speed: Mutex::new(1.0),
        }
    }

    pub fn speed(&self) -> f32 {
        *self.speed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SynthesisEngine for OpenAiEngine {
    fn set_speed(&self, speed: f32) {
        let speed = if speed.is_finite() {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        };
        *self.speed.lock().unwrap_or_else(PoisonError::into_inner) = speed;
    }

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            format: SampleFormat::Int16,
            channels: 1,
            sample_rate: OPENAI_PCM_SAMPLE_RATE,
        }
    }

    fn create_session(&self) -> Box<dyn SynthesisSession> {
        Box::new(OpenAiSession {
            config: Arc::clone(&self.config),
            speed: self.speed(),
            text: Mutex::new(String::new()),
            stopped: AtomicBool::new(false),
        })
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
    speed: f32,
}

/// Session with the engine speed captured at creation.
struct OpenAiSession {
    config: Arc<OpenAiConfig>,
    speed: f32,
    text: Mutex<String>,
    stopped: AtomicBool,
}

impl SynthesisSession for OpenAiSession {
    fn feed(&self, text: &str) {
        let mut buffered = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        if !buffered.is_empty() && !text.is_empty() {
            buffered.push(' ');
        }
        buffered.push_str(text);
    }

    fn play(&self, on_chunk: &mut dyn FnMut(Bytes)) -> anyhow::Result<()> {
        let input = std::mem::take(&mut *self.text.lock().unwrap_or_else(PoisonError::into_inner));
        let pieces = split_into_pieces(&input, MAX_INPUT_CHARS);
        if pieces.is_empty() || self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }

        // The blocking client owns its own runtime, so it is built here on the
        // worker thread rather than inside the server's tokio runtime.
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None)
            .build()
            .context("Failed to build HTTP client")?;

        self.play_pieces(&pieces, on_chunk, |piece: &str, on_chunk: &mut dyn FnMut(Bytes)| {
            self.speak(&client, piece, on_chunk)
        })
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl OpenAiSession {
    /// Speak `pieces` one request at a time, in order, into the same
    /// callback. Stops before the next piece once the session is stopped.
    fn play_pieces<F>(
        &self,
        pieces: &[String],
        on_chunk: &mut dyn FnMut(Bytes),
        mut speak: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut(&str, &mut dyn FnMut(Bytes)) -> anyhow::Result<usize>,
    {
        let mut total = 0usize;
        for (index, piece) in pieces.iter().enumerate() {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            debug!(
                piece = index + 1,
                pieces = pieces.len(),
                chars = piece.chars().count(),
                "Requesting speech"
            );
            total += speak(piece, &mut *on_chunk)?;
        }

        debug!(bytes = total, stopped = self.stopped.load(Ordering::SeqCst), "OpenAI playback ended");
        Ok(())
    }

    /// Run one speech request and forward its audio. Returns the bytes read.
    fn speak(
        &self,
        client: &reqwest::blocking::Client,
        input: &str,
        on_chunk: &mut dyn FnMut(Bytes),
    ) -> anyhow::Result<usize> {
        let body = SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input,
            response_format: "pcm",
            speed: self.speed,
        };

        let mut response = client
            .post(self.config.speech_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .context("OpenAI speech request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            anyhow::bail!("OpenAI speech request returned {status}: {detail}");
        }

        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut total = 0usize;
        while !self.stopped.load(Ordering::SeqCst) {
            let n = response
                .read(&mut buf)
                .context("Failed to read audio from OpenAI")?;
            if n == 0 {
                break;
            }
            total += n;
            on_chunk(Bytes::copy_from_slice(&buf[..n]));
        }
        Ok(total)
    }
}
