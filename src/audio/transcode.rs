//! External decoder glue and the on-disk decode cache.
//!
//! Any input format the decoder understands comes out as canonical PCM in
//! the cache, one artifact per input base name, reused forever. There is
//! no staleness check and no eviction.

use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::error::AudioError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncBufReadExt;
use tokio::process::Command;

pub struct Transcoder {
    decoder: Option<PathBuf>,
    cache_dir: PathBuf,
}

impl Transcoder {
    /// Sets up the cache directory and resolves the decoder binary, either
    /// from the configured path or by probing PATH.
    pub async fn new(configured: Option<PathBuf>, cache_dir: PathBuf) -> Self {
        if let Err(e) = tokio::fs::create_dir_all(&cache_dir).await {
            warn!(
                "Could not create decode cache directory {}: {e}",
                cache_dir.display()
            );
        }

        let decoder = detect_decoder(configured).await;
        if let Some(decoder) = &decoder {
            info!("Using decoder at {}", decoder.display());
        }

        Transcoder { decoder, cache_dir }
    }

    /// Builds a transcoder around an explicit decoder (or none at all),
    /// skipping discovery entirely.
    pub fn with_decoder(decoder: Option<PathBuf>, cache_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            warn!(
                "Could not create decode cache directory {}: {e}",
                cache_dir.display()
            );
        }

        Transcoder { decoder, cache_dir }
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path the artifact for `input` lives at, decoded or not. Keyed by
    /// base name with the extension stripped, so equally named inputs from
    /// different directories collide.
    pub fn artifact_path(&self, input: &Path) -> Result<PathBuf, AudioError> {
        let base = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| AudioError::Transcode {
                input: input.display().to_string(),
                reason: "input has no usable base name".to_string(),
            })?;

        Ok(self.cache_dir.join(format!("{base}.pcm")))
    }

    /// Returns the canonical-PCM artifact for `input`, invoking the
    /// external decoder on a cache miss. Success means the artifact exists
    /// after the process exits; the exit code alone is not trusted.
    pub async fn ensure_decoded(&self, input: &Path) -> Result<PathBuf, AudioError> {
        let artifact = self.artifact_path(input)?;

        if tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            debug!(
                "Decode cache hit for {} -> {}",
                input.display(),
                artifact.display()
            );
            return Ok(artifact);
        }

        let decoder = self.decoder.as_ref().ok_or(AudioError::ConfigurationMissing)?;

        info!("Decoding {} -> {}", input.display(), artifact.display());

        let mut child = Command::new(decoder)
            .arg("-i")
            .arg(input)
            .arg("-ac")
            .arg(CHANNELS.to_string())
            .arg("-f")
            .arg("s16le")
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg(&artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AudioError::Transcode {
                input: input.display().to_string(),
                reason: format!("failed to spawn decoder: {e}"),
            })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = tokio::io::BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("decoder: {line}");
                }
            });
        }

        let status = child.wait().await.map_err(|e| AudioError::Transcode {
            input: input.display().to_string(),
            reason: format!("failed to wait for decoder: {e}"),
        })?;

        let produced = tokio::fs::try_exists(&artifact).await.unwrap_or(false);

        if !status.success() || !produced {
            if produced {
                // A failed run may leave a partial artifact behind; a later
                // cache lookup must not mistake it for a finished decode.
                let _ = tokio::fs::remove_file(&artifact).await;
            }

            return Err(AudioError::Transcode {
                input: input.display().to_string(),
                reason: if status.success() {
                    "decoder exited cleanly but produced no artifact".to_string()
                } else {
                    format!("decoder exited with {status}")
                },
            });
        }

        Ok(artifact)
    }
}

/// Resolves the decoder binary. A configured path is taken as-is when it
/// exists and disables decoding when it does not; with nothing configured,
/// `ffmpeg` on PATH is probed with `-version`.
async fn detect_decoder(configured: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }

        warn!("Configured decoder {} does not exist", path.display());
        return None;
    }

    let probe = Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match probe {
        Ok(status) if status.success() => Some(PathBuf::from("ffmpeg")),
        _ => None,
    }
}
