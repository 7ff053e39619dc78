//! Process-lifetime configuration. Persistence is an explicit non-goal
//! (see DESIGN.md for why the teacher's sqlx-backed `ConfigStore` was
//! dropped); this is a static `serde`-derived struct loaded once from an
//! optional TOML file and overridden by CLI flags, in the same
//! CLI-overrides-config order the teacher's `main.rs` applies.

use serde::{Deserialize, Serialize};

use crate::demux::{AUDIO_CHANNEL_CAPACITY, CAPTION_CHANNEL_CAPACITY, VIDEO_CHANNEL_CAPACITY};
use crate::error::{AppError, Result};
use crate::pipeline::DEFAULT_STREAM_IDLE_TIMEOUT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the SRT listener binds to (consumed outside this crate).
    pub bind_address: String,
    /// Bounded channel capacity for video frames between demuxer and
    /// pipeline.
    pub video_channel_capacity: usize,
    pub audio_channel_capacity: usize,
    pub caption_channel_capacity: usize,
    /// Maximum GOP frames `Relay` retains for replay before a producer is
    /// considered stalled: the cache is dropped rather than allowed to
    /// grow past this, since a well-formed stream resets it at every
    /// keyframe well before this is reached.
    pub max_gop_cache_frames: usize,
    /// Seconds with no frames on any of a pipeline's channels before the
    /// stream is treated as dead and `Pipeline::run` ends it.
    pub stream_idle_timeout_secs: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_address: "0.0.0.0:4443".to_string(),
            video_channel_capacity: VIDEO_CHANNEL_CAPACITY,
            audio_channel_capacity: AUDIO_CHANNEL_CAPACITY,
            caption_channel_capacity: CAPTION_CHANNEL_CAPACITY,
            max_gop_cache_frames: 600,
            stream_idle_timeout_secs: DEFAULT_STREAM_IDLE_TIMEOUT.as_secs(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path` if it exists, falling back to
    /// defaults. A present-but-invalid file is reported as a config
    /// error rather than silently ignored.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(AppConfig::default());
        };
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| AppError::Config(e.to_string()))
    }
}
