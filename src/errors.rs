/*!
 * Error types for the podsplit application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while planning the cut of an episode
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The window/overlap policy cannot be applied
    #[error("Invalid segmentation policy: {0}")]
    InvalidPolicy(String),
}

/// Errors raised by the segment filename codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// Ordinal or total does not fit the two-digit suffix
    #[error("Segment position {ordinal}/{total} of '{stem}' does not fit in two digits")]
    EncodingOverflow {
        /// Episode stem being encoded
        stem: String,
        /// Segment ordinal
        ordinal: u32,
        /// Segment count
        total: u32,
    },

    /// Ordinal is zero or greater than the total
    #[error("Invalid segment position {ordinal}/{total} for '{stem}'")]
    InvalidPosition {
        /// Episode stem being encoded
        stem: String,
        /// Segment ordinal
        ordinal: u32,
        /// Segment count
        total: u32,
    },

    /// The filename does not carry a segment suffix
    #[error("Not a segment filename: '{0}'")]
    MalformedSegmentName(String),
}

/// Errors raised by the feed index
#[derive(Error, Debug)]
pub enum FeedError {
    /// The document cannot be read as a feed
    #[error("Malformed feed {origin}: {message}")]
    MalformedFeed {
        /// Feed file, or `<document>` when loaded from memory
        origin: String,
        /// What went wrong
        message: String,
    },

    /// No item's enclosure matches the filename
    #[error("No episode in the feed matches '{0}'")]
    EpisodeNotFound(String),

    /// Reading or writing the feed file failed
    #[error("Feed I/O error on {path}: {source}")]
    Io {
        /// Feed file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Errors reported by the external audio and speech tools
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool ran and reported a failure
    #[error("{tool} failed on {target}: {message}")]
    ExternalToolFailure {
        /// Tool name (ffmpeg, ffprobe, pico2wave...)
        tool: String,
        /// File being processed
        target: String,
        /// Filtered stderr or explanation
        message: String,
    },

    /// The tool did not finish in time
    #[error("{tool} timed out after {seconds}s on {target}")]
    Timeout {
        /// Tool name
        tool: String,
        /// File being processed
        target: String,
        /// Timeout that expired
        seconds: u64,
    },

    /// Local file handling around the tool failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl MediaError {
    /// Build an `ExternalToolFailure`
    pub fn tool_failure(tool: &str, target: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            tool: tool.to_string(),
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid segmentation policy
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Segment filename encoding or decoding
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// Feed loading, lookup or persistence
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// External tool failure
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Result alias used by the pipeline stages
pub type AppResult<T> = std::result::Result<T, AppError>;
