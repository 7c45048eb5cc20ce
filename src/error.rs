//! Error types for the audio delivery engine.

use thiserror::Error;

/// Failures the engine can hit while delivering audio. Every variant is
/// isolated to one destination (or one submission); none of them take the
/// dispatcher or other destinations down.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No external decoder is configured, so file submissions are disabled.
    /// Raw stream submissions keep working.
    #[error("no decoder configured, file submission disabled")]
    ConfigurationMissing,

    /// The external decoder exited without producing an artifact.
    #[error("decoding {input} produced no artifact: {reason}")]
    Transcode { input: String, reason: String },

    /// Connecting the sink for a destination failed. The destination's
    /// queued entries are abandoned; there is no automatic retry.
    #[error("failed to connect sink for destination {destination}: {source}")]
    SinkConnect {
        destination: u64,
        #[source]
        source: std::io::Error,
    },

    /// A source below the minimum playable length cannot be padded because
    /// it is not seekable. Rejected before any frame is written.
    #[error("source {source_id} is {len} bytes, below the playable minimum, and cannot be padded")]
    UnseekablePaddingRequired { source_id: String, len: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
