//! Audio delivery engine.
//!
//! Submissions enter a destination-keyed ingest queue. A dispatcher drains
//! it and hands each destination its own playback worker, which streams
//! fixed-size PCM frames to a sink adapter. Order is strict FIFO within a
//! destination; destinations run fully in parallel.

pub(crate) mod dispatch;
pub mod pcm;
pub mod prefetch;
pub mod transcode;
pub(crate) mod worker;

use bytes::Bytes;
use dispatch::Registry;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use transcode::Transcoder;

/// Opaque key identifying one playback destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-supplied raw canonical-PCM bytes. In-memory streams are seekable
/// and can be zero padded; reader-backed streams are not.
pub struct RawPcmStream {
    reader: Box<dyn Read + Send>,
    len: u64,
    seekable: bool,
}

impl RawPcmStream {
    pub fn from_bytes(bytes: Bytes) -> Self {
        let len = bytes.len() as u64;
        RawPcmStream {
            reader: Box::new(Cursor::new(bytes)),
            len,
            seekable: true,
        }
    }

    /// Wraps a one-shot reader with a declared length (pipes and the like).
    pub fn from_reader(reader: impl Read + Send + 'static, len: u64) -> Self {
        RawPcmStream {
            reader: Box::new(reader),
            len,
            seekable: false,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub(crate) fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl fmt::Debug for RawPcmStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPcmStream")
            .field("len", &self.len)
            .field("seekable", &self.seekable)
            .finish()
    }
}

/// One queued piece of audio. Immutable once enqueued.
#[derive(Debug)]
pub enum AudioSource {
    /// Media file on disk, decoded through the transcoder's cache before
    /// playback.
    File { path: PathBuf },

    /// Caller-supplied raw PCM.
    Stream(RawPcmStream),
}

impl AudioSource {
    /// Log-friendly identity of the source.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::File { path } => path.display().to_string(),
            AudioSource::Stream(stream) => format!("raw stream ({} bytes)", stream.len()),
        }
    }
}

/// (destination, source) pair travelling through the ingest queue.
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub(crate) destination: DestinationId,
    pub(crate) source: AudioSource,
}

/// One connected playback sink. `write_frame` blocking until the sink
/// accepts the bytes is the engine's backpressure mechanism.
pub trait AudioSink: Send {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Releases the connection. Called exactly once per worker lifecycle.
    fn close(&mut self) -> io::Result<()>;
}

/// Connection factory for sinks. Retry policy is the caller's business,
/// not the engine's.
pub trait SinkConnector: Send + Sync {
    fn connect(&self, destination: DestinationId) -> io::Result<Box<dyn AudioSink>>;
}

/// Engine configuration.
pub struct EngineConfig {
    /// External decoder binary. Probed from PATH when unset.
    pub decoder: Option<PathBuf>,
    /// Directory holding decoded artifacts.
    pub cache_dir: PathBuf,
}

/// Handle for submitting audio to the engine. Cheap to clone.
#[derive(Clone)]
pub struct AudioHandle {
    ingest: mpsc::UnboundedSender<QueueEntry>,
    registry: Arc<Registry>,
    transcoder: Arc<Transcoder>,
}

impl AudioHandle {
    /// Schedules a media file for playback on `destination`. Returns false
    /// right away when no decoder is configured; otherwise true means the
    /// submission was accepted for scheduling, not that it played.
    /// Transcoding happens off the caller's path, in the destination's
    /// worker, so submission order is exactly delivery order.
    pub fn submit_file(&self, destination: DestinationId, path: impl Into<PathBuf>) -> bool {
        if !self.transcoder.has_decoder() {
            debug!("Rejecting file submission for destination {destination}: no decoder");
            return false;
        }

        let entry = QueueEntry {
            destination,
            source: AudioSource::File { path: path.into() },
        };
        self.ingest.send(entry).is_ok()
    }

    /// Enqueues raw PCM directly. Always accepted.
    pub fn submit_stream(&self, destination: DestinationId, stream: RawPcmStream) -> bool {
        let entry = QueueEntry {
            destination,
            source: AudioSource::Stream(stream),
        };
        self.ingest.send(entry).is_ok()
    }

    /// Asks the destination's worker to skip the item it is currently
    /// playing. The pending queue is untouched; unknown destinations are a
    /// no-op.
    pub fn request_stop(&self, destination: DestinationId) {
        self.registry.request_stop(destination);
    }

    /// Whether a worker currently owns this destination.
    pub fn is_active(&self, destination: DestinationId) -> bool {
        self.registry.is_active(destination)
    }
}

/// Builds the engine: transcoder, destination registry, and the dispatch
/// loop draining the ingest queue.
pub async fn init(config: EngineConfig, connector: Arc<dyn SinkConnector>) -> AudioHandle {
    let transcoder = Arc::new(Transcoder::new(config.decoder, config.cache_dir).await);
    if !transcoder.has_decoder() {
        warn!("No decoder available; file submissions are disabled, raw streams still work");
    }

    let registry = Arc::new(Registry::new());
    let (ingest, rx) = mpsc::unbounded_channel();

    dispatch::start(rx, registry.clone(), connector, transcoder.clone());

    AudioHandle {
        ingest,
        registry,
        transcoder,
    }
}
