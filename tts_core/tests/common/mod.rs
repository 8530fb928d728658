//! Scripted synthesis engine for streaming tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tts_core::{SampleFormat, StreamInfo, SynthesisEngine, SynthesisSession};

/// What every session created by a [`FakeEngine`] does when played.
#[derive(Clone)]
pub enum Script {
    /// Emit the chunks and finish.
    Chunks(Vec<Bytes>),
    /// Emit the chunks, then keep "synthesizing" until stopped.
    HoldUntilStopped(Vec<Bytes>),
    /// Emit the chunks, then ignore stop for `hang`.
    IgnoreStop { chunks: Vec<Bytes>, hang: Duration },
    /// Emit the chunks, then fail.
    Fail { chunks: Vec<Bytes>, reason: String },
}

pub struct FakeEngine {
    info: StreamInfo,
    script: Script,
    pub speeds: Mutex<Vec<f32>>,
    pub sessions: AtomicUsize,
    pub fed: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    pub fn new(sample_rate: u32, script: Script) -> Self {
        let info = StreamInfo {
            format: SampleFormat::Int16,
            channels: 1,
            sample_rate,
        };
        Self::with_info(info, script)
    }

    pub fn with_info(info: StreamInfo, script: Script) -> Self {
        Self {
            info,
            script,
            speeds: Mutex::new(Vec::new()),
            sessions: AtomicUsize::new(0),
            fed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SynthesisEngine for FakeEngine {
    fn set_speed(&self, speed: f32) {
        self.speeds.lock().unwrap().push(speed);
    }

    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn create_session(&self) -> Box<dyn SynthesisSession> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeSession {
            script: self.script.clone(),
            fed: Arc::clone(&self.fed),
            stopped: AtomicBool::new(false),
        })
    }
}

struct FakeSession {
    script: Script,
    fed: Arc<Mutex<Vec<String>>>,
    stopped: AtomicBool,
}

impl FakeSession {
    fn wait_for_stop(&self, limit: Duration) {
        let start = Instant::now();
        while !self.stopped.load(Ordering::SeqCst) && start.elapsed() < limit {
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl SynthesisSession for FakeSession {
    fn feed(&self, text: &str) {
        self.fed.lock().unwrap().push(text.to_string());
    }

    fn play(&self, on_chunk: &mut dyn FnMut(Bytes)) -> anyhow::Result<()> {
        match &self.script {
            Script::Chunks(chunks) => {
                chunks.iter().cloned().for_each(&mut *on_chunk);
                Ok(())
            }
            Script::HoldUntilStopped(chunks) => {
                chunks.iter().cloned().for_each(&mut *on_chunk);
                self.wait_for_stop(Duration::from_secs(30));
                Ok(())
            }
            Script::IgnoreStop { chunks, hang } => {
                chunks.iter().cloned().for_each(&mut *on_chunk);
                std::thread::sleep(*hang);
                on_chunk(Bytes::from_static(b"too-late"));
                Ok(())
            }
            Script::Fail { chunks, reason } => {
                chunks.iter().cloned().for_each(&mut *on_chunk);
                Err(anyhow::anyhow!(reason.clone()))
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub fn chunks(parts: &[&'static str]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::from_static(p.as_bytes())).collect()
}
