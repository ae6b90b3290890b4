//! Toolchain configuration.
//!
//! Names (or full paths) of the external programs the pipeline drives, plus
//! the per-invocation deadline. All fields have sensible defaults — a config
//! file only overrides the values it names. Unknown keys are rejected to
//! catch typos early.
//!
//! ```toml
//! # darkroom.toml — all options optional, defaults shown
//! ffmpeg = "ffmpeg"
//! ffprobe = "ffprobe"
//! exiftool = "exiftool"
//! pngquant = "pngquant"
//! gifsicle = "gifsicle"
//! # timeout_secs = 120     # omit to wait indefinitely
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// External program names and the invocation deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
    /// The transcoding engine.
    pub ffmpeg: String,
    /// The stream probe.
    pub ffprobe: String,
    /// Metadata export/import (optional at runtime).
    pub exiftool: String,
    /// PNG quality compaction (optional at runtime).
    pub pngquant: String,
    /// GIF quality compaction (optional at runtime).
    pub gifsicle: String,
    /// Deadline for every external invocation, in seconds. `None` waits
    /// indefinitely.
    pub timeout_secs: Option<u64>,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_exiftool() -> String {
    "exiftool".to_string()
}

fn default_pngquant() -> String {
    "pngquant".to_string()
}

fn default_gifsicle() -> String {
    "gifsicle".to_string()
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            exiftool: default_exiftool(),
            pngquant: default_pngquant(),
            gifsicle: default_gifsicle(),
            timeout_secs: None,
        }
    }
}

impl Toolchain {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The configured deadline as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
