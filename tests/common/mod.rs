//! Test infrastructure for voicecast-rs integration tests.
//!
//! Provides a recording sink adapter and an engine harness so delivery
//! behavior can be observed without a real network or decoder.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub use voicecast_rs::audio::{
    self, AudioHandle, AudioSink, DestinationId, EngineConfig, RawPcmStream, SinkConnector,
};
pub use voicecast_rs::constants::{BYTE_RATE, CHUNK_SIZE, FRAME_SIZE, MIN_PLAYABLE_BYTES};

/// Everything ever delivered to one destination's sink, across all of its
/// worker lifecycles.
#[derive(Default)]
pub struct SinkRecord {
    pub bytes: Vec<u8>,
    pub frames: usize,
    pub closes: usize,
}

/// Sink adapter that records every frame. Destinations can be told to fail
/// their connect, and writes can be slowed down to hold a worker mid-item.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    records: Arc<Mutex<HashMap<u64, SinkRecord>>>,
    connects: Arc<AtomicUsize>,
    failing: Arc<Mutex<HashSet<u64>>>,
    write_delay: Option<Duration>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_delay(delay: Duration) -> Self {
        RecordingConnector {
            write_delay: Some(delay),
            ..Default::default()
        }
    }

    /// Makes connect attempts for this destination fail until healed.
    pub fn fail_destination(&self, destination: DestinationId) {
        self.failing.lock().unwrap().insert(destination.0);
    }

    pub fn heal_destination(&self, destination: DestinationId) {
        self.failing.lock().unwrap().remove(&destination.0);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn bytes_for(&self, destination: DestinationId) -> Vec<u8> {
        self.records
            .lock()
            .unwrap()
            .get(&destination.0)
            .map(|record| record.bytes.clone())
            .unwrap_or_default()
    }

    pub fn frames_for(&self, destination: DestinationId) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&destination.0)
            .map(|record| record.frames)
            .unwrap_or_default()
    }

    pub fn closes_for(&self, destination: DestinationId) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&destination.0)
            .map(|record| record.closes)
            .unwrap_or_default()
    }
}

impl SinkConnector for RecordingConnector {
    fn connect(&self, destination: DestinationId) -> io::Result<Box<dyn AudioSink>> {
        if self.failing.lock().unwrap().contains(&destination.0) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("forced connect failure for {destination}"),
            ));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .entry(destination.0)
            .or_default();

        Ok(Box::new(RecordingSink {
            destination: destination.0,
            records: self.records.clone(),
            write_delay: self.write_delay,
        }))
    }
}

struct RecordingSink {
    destination: u64,
    records: Arc<Mutex<HashMap<u64, SinkRecord>>>,
    write_delay: Option<Duration>,
}

impl AudioSink for RecordingSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }

        let mut records = self.records.lock().unwrap();
        let record = records.entry(self.destination).or_default();
        record.bytes.extend_from_slice(frame);
        record.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut records = self.records.lock().unwrap();
        records.entry(self.destination).or_default().closes += 1;
        Ok(())
    }
}

/// Engine plus the collaborators the tests observe.
pub struct TestEngine {
    pub audio: AudioHandle,
    pub connector: RecordingConnector,
    pub dir: TempDir,
}

impl TestEngine {
    /// Path under the temp dir whose base name maps to a staged artifact.
    pub fn input_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.mp3"))
    }

    /// Places a finished artifact in the decode cache, as if `name` had
    /// been transcoded already. Returns the input path to submit.
    pub fn stage_artifact(&self, name: &str, data: &[u8]) -> PathBuf {
        let cache = self.dir.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join(format!("{name}.pcm")), data).unwrap();
        self.input_path(name)
    }
}

async fn build_engine(connector: RecordingConnector, decoder: Option<PathBuf>) -> TestEngine {
    let dir = TempDir::new().unwrap();

    let decoder = match decoder {
        Some(decoder) => decoder,
        None => {
            // An existing but never-invoked placeholder, so file
            // submissions are accepted and served from the staged cache.
            let placeholder = dir.path().join("decoder-placeholder");
            std::fs::write(&placeholder, b"").unwrap();
            placeholder
        }
    };

    let audio = audio::init(
        EngineConfig {
            decoder: Some(decoder),
            cache_dir: dir.path().join("cache"),
        },
        Arc::new(connector.clone()),
    )
    .await;

    TestEngine {
        audio,
        connector,
        dir,
    }
}

/// Engine with a recording connector and a placeholder decoder.
pub async fn engine() -> TestEngine {
    build_engine(RecordingConnector::new(), None).await
}

pub async fn engine_with(connector: RecordingConnector) -> TestEngine {
    build_engine(connector, None).await
}

/// Engine whose transcoder really invokes `decoder`.
pub async fn engine_with_decoder(connector: RecordingConnector, decoder: PathBuf) -> TestEngine {
    build_engine(connector, Some(decoder)).await
}

/// Engine with no decoder at all: file submissions fail fast.
pub async fn engine_without_decoder() -> TestEngine {
    let dir = TempDir::new().unwrap();
    let connector = RecordingConnector::new();

    let audio = audio::init(
        EngineConfig {
            decoder: Some(dir.path().join("no-such-decoder")),
            cache_dir: dir.path().join("cache"),
        },
        Arc::new(connector.clone()),
    )
    .await;

    TestEngine {
        audio,
        connector,
        dir,
    }
}

/// Polls `cond` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cond()
}

/// Waits until the destination has been served and its worker retired:
/// at least one close recorded and no live worker.
pub async fn wait_served(engine: &TestEngine, destination: DestinationId) -> bool {
    let audio = engine.audio.clone();
    let connector = engine.connector.clone();

    wait_until(Duration::from_secs(20), move || {
        connector.closes_for(destination) > 0 && !audio.is_active(destination)
    })
    .await
}

/// A raw stream of `len` bytes, every byte set to `value`.
pub fn marked_stream(value: u8, len: usize) -> RawPcmStream {
    RawPcmStream::from_bytes(vec![value; len].into())
}

/// Counts delivered bytes equal to `value`.
pub fn count_marked(bytes: &[u8], value: u8) -> usize {
    bytes.iter().filter(|b| **b == value).count()
}
