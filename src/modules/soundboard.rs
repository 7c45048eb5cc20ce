//! Soundboard module: chat commands driving the audio engine.
//!
//! `!play <name>` resolves a file under the configured sounds directory
//! and submits it, `!tone <hz> [secs]` submits a synthesized sine signal
//! as a raw stream, `!stop` skips whatever the channel is playing.

use crate::audio::{pcm, DestinationId, RawPcmStream};
use crate::config::SoundboardConfig;
use crate::event::{EventKind, GatewayEvent};
use crate::modules::{Module, ModuleContext};
use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

/// Longest tone a single command may synthesize, in seconds.
const MAX_TONE_SECS: f64 = 10.0;

lazy_static! {
    static ref TONE_ARGS_RE: Regex =
        Regex::new(r"^(\d+(?:\.\d+)?)(?:\s+(\d+(?:\.\d+)?))?$").unwrap();
}

pub struct Soundboard {
    sounds_dir: PathBuf,
    command_re: Regex,
}

impl Soundboard {
    pub fn new(config: &SoundboardConfig) -> Self {
        Soundboard {
            sounds_dir: config.sounds_dir.clone(),
            command_re: config.command_re.clone(),
        }
    }

    /// Finds a sound file by bare name. Names with path separators never
    /// match, so commands cannot reach outside the sounds directory.
    fn resolve_sound(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }

        let entries = std::fs::read_dir(&self.sounds_dir).ok()?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_stem().and_then(|stem| stem.to_str()) == Some(name) {
                return Some(path);
            }
        }

        None
    }
}

#[async_trait]
impl Module for Soundboard {
    fn name(&self) -> &str {
        "soundboard"
    }

    fn capabilities(&self) -> &'static [EventKind] {
        &[EventKind::MessageReceived]
    }

    async fn handle_event(&self, event: &GatewayEvent, ctx: &ModuleContext) -> Result<()> {
        let GatewayEvent::MessageReceived {
            channel,
            author,
            text,
        } = event
        else {
            return Ok(());
        };

        let Some(caps) = self.command_re.captures(text) else {
            return Ok(());
        };

        let command = &caps[1];
        let args = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let destination = DestinationId(*channel);

        match command {
            "play" => {
                let Some(path) = self.resolve_sound(args) else {
                    info!("{author} asked for unknown sound {args:?}");
                    return Ok(());
                };

                if !ctx.audio.submit_file(destination, path) {
                    warn!("File submission for destination {destination} rejected: no decoder configured");
                }
            }
            "tone" => {
                let Some(caps) = TONE_ARGS_RE.captures(args) else {
                    info!("{author} sent malformed tone args {args:?}");
                    return Ok(());
                };

                let freq: f64 = caps[1].parse()?;
                let secs: f64 = caps
                    .get(2)
                    .map(|m| m.as_str().parse::<f64>())
                    .transpose()?
                    .unwrap_or(1.0)
                    .min(MAX_TONE_SECS);

                let stream = RawPcmStream::from_bytes(pcm::sine(freq, secs));
                ctx.audio.submit_stream(destination, stream);
            }
            "stop" => {
                ctx.audio.request_stop(destination);
            }
            _ => {}
        }

        Ok(())
    }
}
