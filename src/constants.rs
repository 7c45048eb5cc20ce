use std::time::Duration;

// Canonical PCM format: everything past the decoder is in this format.
pub const SAMPLE_RATE: u32 = 48000; // 48 kHz sample rate
pub const BIT_DEPTH: u16 = 16; // 16 bits per sample
pub const CHANNELS: u16 = 2; // Stereo

/// Bytes per second of canonical audio (48000 Hz x 2 channels x 2 bytes).
pub const BYTE_RATE: usize = 192_000;

/// Duration of one prefetch chunk in seconds of canonical audio.
/// Shorter in debug builds.
#[cfg(debug_assertions)]
pub const CHUNK_SECONDS: usize = 5;
#[cfg(not(debug_assertions))]
pub const CHUNK_SECONDS: usize = 16;

/// Size of one prefetch chunk in bytes.
pub const CHUNK_SIZE: usize = CHUNK_SECONDS * BYTE_RATE;

/// Bytes per sink write (20 ms of canonical audio). Each write blocks until
/// the sink accepts it; that backpressure is the engine's only rate control.
pub const FRAME_SIZE: usize = 3840;

/// Sources shorter than this stall some downstream sinks. Seekable sources
/// below the threshold are zero padded up to exactly this many bytes.
pub const MIN_PLAYABLE_BYTES: u64 = BYTE_RATE as u64;

/// Idle delay between ingest queue drain passes.
pub const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on waiting for an in-flight background chunk load when a
/// swap catches it mid-read.
pub const CHUNK_SWAP_TIMEOUT: Duration = Duration::from_secs(10);
