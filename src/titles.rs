use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::errors::{AppResult, MediaError};
use crate::feed::FeedIndex;
use crate::media::{AudioCodec, SpeechSynthesizer};
use crate::naming;

// @module: Segment titles, from filename to spoken announcement

/// Title announced at the start of a segment
pub fn format_title(ordinal: u32, total: u32, episode_title: &str) -> String {
    format!("Part {} of {} of {}", ordinal, total, episode_title)
}

/// Rewrite a title so the speech engine reads it naturally.
///
/// Slashes in "2/3" style titles are read as the French "sur".
pub fn make_title_pronounceable(title: &str) -> String {
    title.replace('/', " sur ")
}

/// Title of a segment, recovered from its filename and the feed.
///
/// The episode filename is rebuilt from the decoded stem and the segment's own
/// extension, then looked up in the feed.
pub fn resolve(segment_filename: &str, feed: &FeedIndex) -> AppResult<String> {
    let segment = naming::decode(segment_filename)?;
    let (_, extension) = naming::split_stem(naming::basename(segment_filename));
    let episode_filename = naming::join_stem(&segment.stem, extension);

    let episode = feed.lookup(&episode_filename)?;
    Ok(format_title(segment.ordinal, segment.total, &episode.title))
}

/// Prepends a spoken title to segment files
#[derive(Debug, Clone)]
pub struct SegmentTitler {
    codec: Arc<dyn AudioCodec>,
    speech: Arc<dyn SpeechSynthesizer>,
    language: String,
}

impl SegmentTitler {
    pub fn new(codec: Arc<dyn AudioCodec>, speech: Arc<dyn SpeechSynthesizer>, language: impl Into<String>) -> Self {
        Self {
            codec,
            speech,
            language: language.into(),
        }
    }

    /// Replace `segment_path` with the spoken `title` followed by the original audio.
    ///
    /// Work happens in a scratch directory next to the segment, and the segment
    /// is only replaced by a final rename: on any failure it is left untouched
    /// and the scratch directory is removed.
    pub async fn apply_title(&self, segment_path: &Path, title: &str) -> AppResult<()> {
        self.title_into(segment_path, segment_path, title).await
    }

    /// Write the spoken `title` followed by `source` to `destination`, then drop `source`.
    ///
    /// Both paths must share a directory. `source` is only removed once
    /// `destination` holds the titled audio.
    pub async fn title_into(&self, source: &Path, destination: &Path, title: &str) -> AppResult<()> {
        if !source.is_file() {
            return Err(MediaError::io(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "segment file not found"),
            )
            .into());
        }

        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let scratch = tempfile::Builder::new()
            .prefix(".podsplit-")
            .tempdir_in(&parent)
            .map_err(|e| MediaError::io(&parent, e))?;

        let spoken = make_title_pronounceable(title);
        let waveform = self.speech.synthesize(&spoken, &self.language).await?;

        let title_wav = scratch.path().join("title.wav");
        fs::write(&title_wav, &waveform).map_err(|e| MediaError::io(&title_wav, e))?;

        let title_mp3 = scratch.path().join("title.mp3");
        self.codec.transcode(&title_wav, &title_mp3).await?;

        let destination_name = naming::path_filename(destination);
        let (_, extension) = naming::split_stem(&destination_name);
        let titled = scratch.path().join(naming::join_stem("titled", extension));
        self.codec
            .concatenate(&[title_mp3, source.to_path_buf()], &titled)
            .await?;

        // Same directory, so the rename is atomic
        fs::rename(&titled, destination).map_err(|e| MediaError::io(destination, e))?;
        if source != destination {
            fs::remove_file(source).map_err(|e| MediaError::io(source, e))?;
        }
        debug!("Titled {} with '{}'", destination.display(), title);

        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory: {}", e);
        }
        Ok(())
    }
}
