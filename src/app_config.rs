use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Length of each segment before overlap, in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u32,

    /// Seconds each segment repeats from the start of the next one
    #[serde(default = "default_overlap_seconds")]
    pub overlap_seconds: u32,

    /// Name of the feed file inside the input folder
    #[serde(default = "default_feed_filename")]
    pub feed_filename: String,

    /// External audio tools
    #[serde(default)]
    pub media: MediaConfig,

    /// Speech synthesis of the segment titles
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// ffmpeg/ffprobe settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaConfig {
    // @field: ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    // @field: ffprobe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Maximum run time of a single tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Extra attempts after a failed tool invocation
    #[serde(default = "default_tool_retries")]
    pub tool_retries: u32,

    /// Bitrate of the mp3 files produced by transcoding
    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            tool_timeout_secs: default_tool_timeout_secs(),
            tool_retries: default_tool_retries(),
            mp3_bitrate: default_mp3_bitrate(),
        }
    }
}

/// Speech engine settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpeechConfig {
    // @field: pico2wave executable
    #[serde(default = "default_engine_path")]
    pub engine_path: String,

    /// Voice language, e.g. "fr-FR"
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            language: default_language(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching log crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_window_seconds() -> u32 {
    600 // ten minute parts
}

fn default_overlap_seconds() -> u32 {
    10
}

fn default_feed_filename() -> String {
    "rss.xml".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    600
}

fn default_tool_retries() -> u32 {
    1
}

fn default_mp3_bitrate() -> String {
    "192k".to_string()
}

fn default_engine_path() -> String {
    "pico2wave".to_string()
}

fn default_language() -> String {
    "fr-FR".to_string()
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to open config file {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.window_seconds == 0 {
            return Err(anyhow!("window_seconds must be greater than zero"));
        }

        if self.feed_filename.trim().is_empty() {
            return Err(anyhow!("feed_filename must not be empty"));
        }

        if self.media.ffmpeg_path.trim().is_empty() || self.media.ffprobe_path.trim().is_empty() {
            return Err(anyhow!("ffmpeg_path and ffprobe_path must not be empty"));
        }

        if self.media.tool_timeout_secs == 0 {
            return Err(anyhow!("tool_timeout_secs must be greater than zero"));
        }

        if self.speech.engine_path.trim().is_empty() {
            return Err(anyhow!("Speech engine_path must not be empty"));
        }

        if self.speech.language.trim().is_empty() {
            return Err(anyhow!("Speech language must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            window_seconds: default_window_seconds(),
            overlap_seconds: default_overlap_seconds(),
            feed_filename: default_feed_filename(),
            media: MediaConfig::default(),
            speech: SpeechConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
