use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::read_to_string;

#[derive(Clone, Deserialize, Serialize)]
pub struct SoundboardConfig {
    /// Directory holding playable sound files.
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,

    /// Pattern splitting a chat line into command and arguments.
    #[serde(default = "default_command_re", with = "serde_regex")]
    pub command_re: Regex,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        SoundboardConfig {
            sounds_dir: default_sounds_dir(),
            command_re: default_command_re(),
        }
    }
}

fn default_sounds_dir() -> PathBuf {
    PathBuf::from("./sounds")
}

fn default_command_re() -> Regex {
    Regex::new(r"^!(\w+)(?:\s+(.+))?$").unwrap()
}

/// One destination the TCP sink adapter can reach.
#[derive(Clone, Deserialize, Serialize)]
pub struct DestinationRoute {
    pub id: u64,
    /// host:port the destination's PCM stream is served to.
    pub addr: String,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    /// External decoder binary. Probed from PATH when unset.
    pub decoder_path: Option<PathBuf>,

    /// Directory for decoded artifacts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Channel id the console gateway attributes its lines to.
    #[serde(default)]
    pub console_channel: u64,

    /// Routing table for the TCP sink adapter.
    #[serde(default)]
    pub destinations: Vec<DestinationRoute>,

    #[serde(default)]
    pub soundboard: SoundboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            decoder_path: None,
            cache_dir: default_cache_dir(),
            console_channel: 0,
            destinations: Vec::new(),
            soundboard: SoundboardConfig::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./decode-cache")
}

pub async fn load() -> Result<Config> {
    let config = read_to_string("Config.toml").await?;
    let config: Config = toml::from_str(&config)?;

    Ok(config)
}

/// Loads Config.toml, falling back to defaults when it is absent or
/// unreadable.
pub async fn load_or_default() -> Config {
    match load().await {
        Ok(config) => config,
        Err(e) => {
            info!("Could not read Config.toml ({e}), using defaults");
            Config::default()
        }
    }
}
