//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use bytes::Bytes;
use server::config::ServerConfig;
use server::{build_router, AppState};
use tts_core::{SampleFormat, StreamConfig, StreamInfo, SynthesisEngine, SynthesisSession, TtsService};

pub const STREAM_LIMIT: Duration = Duration::from_secs(5);

/// Engine whose sessions emit fixed chunks, optionally holding the stream
/// open until stopped.
pub struct MockEngine {
    sample_rate: u32,
    channels: u16,
    chunks: Vec<Bytes>,
    hold_until_stopped: bool,
    pub fed: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub fn finishing(sample_rate: u32, chunks: &[&'static str]) -> Self {
        Self::build(sample_rate, chunks, false)
    }

    pub fn holding(sample_rate: u32, chunks: &[&'static str]) -> Self {
        Self::build(sample_rate, chunks, true)
    }

    fn build(sample_rate: u32, chunks: &[&'static str], hold_until_stopped: bool) -> Self {
        Self {
            sample_rate,
            channels: 1,
            chunks: chunks.iter().map(|c| Bytes::from_static(c.as_bytes())).collect(),
            hold_until_stopped,
            fed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }
}

impl SynthesisEngine for MockEngine {
    fn set_speed(&self, _speed: f32) {}

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            format: SampleFormat::Int16,
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    fn create_session(&self) -> Box<dyn SynthesisSession> {
        Box::new(MockSession {
            chunks: self.chunks.clone(),
            hold_until_stopped: self.hold_until_stopped,
            fed: Arc::clone(&self.fed),
            stopped: AtomicBool::new(false),
        })
    }
}

struct MockSession {
    chunks: Vec<Bytes>,
    hold_until_stopped: bool,
    fed: Arc<Mutex<Vec<String>>>,
    stopped: AtomicBool,
}

impl SynthesisSession for MockSession {
    fn feed(&self, text: &str) {
        self.fed.lock().unwrap().push(text.to_string());
    }

    fn play(&self, on_chunk: &mut dyn FnMut(Bytes)) -> anyhow::Result<()> {
        for chunk in &self.chunks {
            on_chunk(chunk.clone());
        }
        if self.hold_until_stopped {
            let start = Instant::now();
            while !self.stopped.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(30) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Create a test app instance around `engine`
pub fn create_test_app(engine: MockEngine) -> Router {
    let config = ServerConfig {
        stop_timeout_ms: 200,
        ..ServerConfig::default()
    };
    let tts = Arc::new(TtsService::new(
        Arc::new(engine),
        StreamConfig {
            stop_timeout: config.stop_timeout(),
        },
    ));
    build_router(AppState { tts, config })
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a whole body, failing the test if the stream never ends
pub async fn read_body(response: Response<Body>) -> Bytes {
    tokio::time::timeout(STREAM_LIMIT, to_bytes(response.into_body(), usize::MAX))
        .await
        .expect("response body did not terminate")
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&read_body(response).await).unwrap()
}
