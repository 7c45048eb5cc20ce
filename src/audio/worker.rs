//! Per-destination playback worker.
//!
//! Lifecycle: spawned by the dispatcher on the first enqueue for its key
//! (Idle -> Active), plays its queue strictly in order, then tears down
//! (Draining -> Terminated). Each worker is internally sequential, so
//! frames from two sources for one destination are never interleaved.

use super::dispatch::{DestinationState, Registry};
use super::prefetch::PrefetchingReader;
use super::transcode::Transcoder;
use super::{AudioSink, AudioSource, DestinationId, SinkConnector};
use crate::constants::{FRAME_SIZE, MIN_PLAYABLE_BYTES};
use crate::error::AudioError;
use std::io::{self, Read};
use std::sync::Arc;
use tokio::runtime::Handle;

/// How a single source ended.
enum Outcome {
    Completed { bytes: u64 },
    Stopped { bytes: u64 },
}

/// Starts the worker on the blocking pool; the whole decode/send pipeline
/// blocks on disk and on the sink.
pub(crate) fn spawn(
    destination: DestinationId,
    state: Arc<DestinationState>,
    registry: Arc<Registry>,
    connector: Arc<dyn SinkConnector>,
    transcoder: Arc<Transcoder>,
) {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || {
        run(destination, state, registry, connector, transcoder, handle)
    });
}

fn run(
    destination: DestinationId,
    state: Arc<DestinationState>,
    registry: Arc<Registry>,
    connector: Arc<dyn SinkConnector>,
    transcoder: Arc<Transcoder>,
    handle: Handle,
) {
    debug!("Worker for destination {destination} starting");

    let mut sink = match connector.connect(destination) {
        Ok(sink) => sink,
        Err(e) => {
            let e = AudioError::SinkConnect {
                destination: destination.0,
                source: e,
            };
            error!("{e}");

            // No retry. The destination's entries are abandoned, loudly.
            for source in registry.remove(destination) {
                warn!(
                    "Abandoning {} queued for destination {destination}",
                    source.describe()
                );
            }
            return;
        }
    };

    // Active: one source at a time, strictly FIFO. A failure on one source
    // is logged and the worker moves on; it never escapes the destination.
    while let Some(source) = state.pop_next() {
        let label = source.describe();

        match play(sink.as_mut(), source, &state, &transcoder, &handle) {
            Ok(Outcome::Completed { bytes }) => {
                debug!("Finished {label} for destination {destination} ({bytes} bytes)");
            }
            Ok(Outcome::Stopped { bytes }) => {
                info!("Stopped {label} for destination {destination} after {bytes} bytes");
            }
            Err(e) => {
                error!("Failed to play {label} for destination {destination}: {e}");
            }
        }
    }

    // Draining: release the sink exactly once, drop the registration, and
    // discard anything that raced into the queue during this window rather
    // than leaking it into a destination nobody serves anymore.
    if let Err(e) = sink.close() {
        warn!("Error closing sink for destination {destination}: {e}");
    }

    for source in registry.remove(destination) {
        warn!(
            "Discarding {} submitted to destination {destination} during teardown",
            source.describe()
        );
    }

    debug!("Worker for destination {destination} terminated");
}

/// Plays one source to the sink, applying the minimum-length padding rule
/// before the first frame goes out.
fn play(
    sink: &mut dyn AudioSink,
    source: AudioSource,
    state: &DestinationState,
    transcoder: &Transcoder,
    handle: &Handle,
) -> Result<Outcome, AudioError> {
    match source {
        AudioSource::File { path } => {
            let artifact = handle.block_on(transcoder.ensure_decoded(&path))?;
            let mut reader = PrefetchingReader::open(&artifact);
            // Surfaces a deferred-open failure before any frame is written.
            let len = reader.len()?;
            stream_frames(sink, &mut reader, len, state)
        }
        AudioSource::Stream(stream) => {
            let len = stream.len();

            if len < MIN_PLAYABLE_BYTES && !stream.is_seekable() {
                return Err(AudioError::UnseekablePaddingRequired {
                    source_id: format!("raw stream ({len} bytes)"),
                    len,
                });
            }

            let mut reader = stream.into_reader();
            stream_frames(sink, reader.as_mut(), len, state)
        }
    }
}

/// Streams fixed-size frames until the source is exhausted, then zero pads
/// short sources up to the playable minimum. The stop flag is checked once
/// per frame iteration: observing it discards the rest of this item only,
/// clears the flag, and returns control to the queue.
fn stream_frames(
    sink: &mut dyn AudioSink,
    reader: &mut dyn Read,
    total_len: u64,
    state: &DestinationState,
) -> Result<Outcome, AudioError> {
    let mut frame = [0u8; FRAME_SIZE];
    let mut sent: u64 = 0;

    loop {
        if state.take_stop() {
            return Ok(Outcome::Stopped { bytes: sent });
        }

        let n = fill_frame(reader, &mut frame)?;
        if n == 0 {
            break;
        }

        sink.write_frame(&frame[..n])?;
        sent += n as u64;
    }

    let mut padding = MIN_PLAYABLE_BYTES.saturating_sub(total_len);
    if padding > 0 {
        frame.fill(0);

        while padding > 0 {
            if state.take_stop() {
                return Ok(Outcome::Stopped { bytes: sent });
            }

            let n = (FRAME_SIZE as u64).min(padding) as usize;
            sink.write_frame(&frame[..n])?;
            sent += n as u64;
            padding -= n as u64;
        }
    }

    Ok(Outcome::Completed { bytes: sent })
}

/// Fills as much of one frame as the reader can give. Zero means the
/// source is exhausted.
fn fill_frame(reader: &mut dyn Read, frame: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < frame.len() {
        match reader.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
