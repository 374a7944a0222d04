use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{AppError, AppResult, FeedError, MediaError, NamingError};
use crate::feed::{self, FeedIndex};
use crate::file_utils::FileManager;
use crate::media::{AudioCodec, FfmpegCodec, PicoTts, SpeechSynthesizer};
use crate::naming;
use crate::planner::{self, TimeRange};
use crate::titles::{self, SegmentTitler};

// @module: Application controller driving a whole podcast split

/// Name of the per-run issues file written in the output folder
pub const ISSUES_LOG_FILENAME: &str = "podsplit.issues.log";

/// A file that could not be processed, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// File name of the episode or segment
    pub file: String,
    /// Error message
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.reason)
    }
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Episodes found in the input folder
    pub episodes: usize,
    /// Segments written by the cut phase
    pub segments_cut: usize,
    /// Segments that received their spoken title
    pub segments_titled: usize,
    /// Episode durations written into the feed
    pub durations_recorded: usize,
    /// Episodes left uncut because their segment count does not fit the names
    pub skipped_episodes: Vec<String>,
    /// Episodes and segments that failed
    pub failures: Vec<Failure>,
}

impl RunSummary {
    /// True when nothing failed; skipped episodes are not failures
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold the counters of a later phase into this summary
    pub fn merge(&mut self, other: RunSummary) {
        self.episodes += other.episodes;
        self.segments_cut += other.segments_cut;
        self.segments_titled += other.segments_titled;
        self.durations_recorded += other.durations_recorded;
        self.skipped_episodes.extend(other.skipped_episodes);
        self.failures.extend(other.failures);
    }

    fn record_failure(&mut self, file: impl Into<String>, error: &dyn fmt::Display) {
        self.failures.push(Failure {
            file: file.into(),
            reason: error.to_string(),
        });
    }

    /// One-line report of the counters
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} episodes, {} segments cut, {} segments titled",
            self.episodes, self.segments_cut, self.segments_titled
        );
        if self.durations_recorded > 0 {
            line.push_str(&format!(", {} durations recorded", self.durations_recorded));
        }
        line.push_str(&format!(
            ", {} skipped, {} failures",
            self.skipped_episodes.len(),
            self.failures.len()
        ));
        line
    }
}

/// Main application controller for splitting podcasts
pub struct Controller {
    // @field: App configuration
    config: Config,
    codec: Arc<dyn AudioCodec>,
    titler: SegmentTitler,
}

impl Controller {
    // @method: Create a controller backed by ffmpeg and pico2wave
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let timeout = Duration::from_secs(config.media.tool_timeout_secs);
        let codec: Arc<dyn AudioCodec> = Arc::new(FfmpegCodec::new(config.media.clone()));
        let speech: Arc<dyn SpeechSynthesizer> = Arc::new(PicoTts::new(config.speech.clone(), timeout));

        Ok(Self::with_collaborators(config, codec, speech))
    }

    /// Create a controller over the given codec and speech engine
    pub fn with_collaborators(config: Config, codec: Arc<dyn AudioCodec>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        let titler = SegmentTitler::new(Arc::clone(&codec), speech, config.speech.language.clone());
        Self { config, codec, titler }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cut every episode of `input_dir` into `output_dir`, then title every segment.
    ///
    /// Only an invalid policy, an unreadable feed or an unusable folder abort
    /// the run. Per-file problems are logged and recorded in the summary.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path, window: u32, overlap: u32) -> Result<RunSummary> {
        let start_time = Instant::now();

        planner::validate_policy(window).map_err(AppError::from)?;
        let feed = self.load_feed(input_dir)?;
        FileManager::ensure_dir(output_dir)?;

        let mut summary = RunSummary::default();

        let converted = self.convert_m4a_files(input_dir, &mut summary).await?;
        if converted > 0 {
            info!("Converted {} m4a episodes to mp3", converted);
        }

        summary.merge(self.cut_all(input_dir, output_dir, window, overlap).await?);
        summary.merge(self.title_all(&feed, output_dir).await?);

        let elapsed = start_time.elapsed();
        info!("Split complete in {}: {}", Self::format_elapsed(elapsed), summary.summary());
        self.write_issues(output_dir, &summary, &format!("split {}", input_dir.display()));

        Ok(summary)
    }

    /// Title the segments of `output_dir` still waiting for their title, using the feed of `input_dir`
    pub async fn run_titles(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary> {
        let start_time = Instant::now();

        let feed = self.load_feed(input_dir)?;
        if !FileManager::dir_exists(output_dir) {
            return Err(anyhow!("Output directory does not exist: {:?}", output_dir));
        }

        let summary = self.title_all(&feed, output_dir).await?;

        info!("Titling complete in {}: {}", Self::format_elapsed(start_time.elapsed()), summary.summary());
        self.write_issues(output_dir, &summary, &format!("title {}", output_dir.display()));

        Ok(summary)
    }

    /// Phase one: cut every `.mp3` episode of `input_dir` into overlapping, untitled segments.
    ///
    /// An episode needing more segments than the names can carry is skipped
    /// before anything is written. Segments left by an earlier run of an
    /// episode are removed before it is cut again. An episode whose cut fails
    /// loses every segment written for it.
    pub async fn cut_all(&self, input_dir: &Path, output_dir: &Path, window: u32, overlap: u32) -> Result<RunSummary> {
        planner::validate_policy(window).map_err(AppError::from)?;
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }
        FileManager::ensure_dir(output_dir)?;

        let episodes = FileManager::find_files(input_dir, "mp3")?;
        let mut summary = RunSummary {
            episodes: episodes.len(),
            ..RunSummary::default()
        };
        if episodes.is_empty() {
            warn!("No mp3 episodes found in {:?}", input_dir);
            return Ok(summary);
        }

        let progress_bar = Self::progress_bar(episodes.len(), "episodes");
        progress_bar.set_message("Cutting");

        for episode in &episodes {
            let filename = naming::path_filename(episode);
            progress_bar.set_message(format!("Cutting: {}", filename));

            match self.cut_episode(episode, output_dir, window, overlap).await {
                Ok(count) => {
                    debug!("{} cut into {} segments", filename, count);
                    summary.segments_cut += count;
                }
                Err(AppError::Naming(e @ NamingError::EncodingOverflow { .. })) => {
                    warn!("Skipping {}: {}", filename, e);
                    summary.skipped_episodes.push(filename);
                }
                Err(e @ AppError::Plan(_)) => {
                    progress_bar.finish_and_clear();
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Failed to cut {}: {}", filename, e);
                    summary.record_failure(filename, &e);
                }
            }

            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        info!("Cut {} segments from {} episodes", summary.segments_cut, summary.episodes);
        Ok(summary)
    }

    /// Phase two: prepend the spoken title to every untitled segment found in `output_dir`.
    ///
    /// A titled segment takes its final `_part_NN_of_MM` name, so segments that
    /// already carry a title are never titled twice.
    pub async fn title_all(&self, feed: &FeedIndex, output_dir: &Path) -> Result<RunSummary> {
        let segments: Vec<(PathBuf, String)> = FileManager::find_files(output_dir, "mp3")?
            .into_iter()
            .filter_map(|path| naming::titled_filename(&naming::path_filename(&path)).map(|name| (path, name)))
            .collect();

        let mut summary = RunSummary::default();
        if segments.is_empty() {
            info!("No segments to title in {:?}", output_dir);
            return Ok(summary);
        }

        let progress_bar = Self::progress_bar(segments.len(), "segments");
        progress_bar.set_message("Titling");

        for (segment, filename) in &segments {
            progress_bar.set_message(format!("Titling: {}", filename));

            match self.title_segment(segment, &output_dir.join(filename), feed).await {
                Ok(title) => {
                    debug!("{} <- '{}'", filename, title);
                    summary.segments_titled += 1;
                }
                Err(e) => {
                    error!("Failed to title {}: {}", filename, e);
                    summary.record_failure(filename.as_str(), &e);
                }
            }

            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        info!("Titled {} of {} segments", summary.segments_titled, segments.len());
        Ok(summary)
    }

    /// Write the measured duration of every `.mp3` episode into the feed.
    ///
    /// The previous feed is kept as a timestamped backup. Episodes missing from
    /// the feed are reported and left out; episodes that cannot be measured are
    /// recorded as failures.
    pub async fn fill_durations(&self, input_dir: &Path) -> Result<RunSummary> {
        let feed_path = input_dir.join(&self.config.feed_filename);
        let mut feed = self.load_feed(input_dir)?;

        let episodes = FileManager::find_files(input_dir, "mp3")?;
        let mut summary = RunSummary {
            episodes: episodes.len(),
            ..RunSummary::default()
        };
        let progress_bar = Self::progress_bar(episodes.len(), "episodes");
        progress_bar.set_message("Probing");

        for episode in &episodes {
            let filename = naming::path_filename(episode);
            progress_bar.set_message(format!("Probing: {}", filename));

            match self.probe_into_feed(episode, &filename, &mut feed).await {
                Ok(formatted) => {
                    debug!("{} lasts {}", filename, formatted);
                    summary.durations_recorded += 1;
                }
                Err(AppError::Feed(FeedError::EpisodeNotFound(_))) => {
                    warn!("{} is not listed in {}, duration not recorded", filename, self.config.feed_filename);
                }
                Err(e) => {
                    error!("Failed to measure {}: {}", filename, e);
                    summary.record_failure(filename, &e);
                }
            }

            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        if summary.durations_recorded == 0 {
            info!("No duration to record, {} left unchanged", feed_path.display());
            return Ok(summary);
        }

        if let Some(backup) = FileManager::backup_file(&feed_path, chrono::Local::now())? {
            info!("Previous feed saved as {}", backup.display());
        }
        feed.persist(&feed_path).map_err(AppError::from)?;
        info!("Recorded {} durations in {}", summary.durations_recorded, feed_path.display());

        Ok(summary)
    }

    fn load_feed(&self, input_dir: &Path) -> Result<FeedIndex> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let feed_path = input_dir.join(&self.config.feed_filename);
        let feed = FeedIndex::open(&feed_path).map_err(AppError::from)?;
        info!("Loaded {} episodes from {}", feed.len(), feed_path.display());
        Ok(feed)
    }

    /// Transcode `.m4a` episodes that have no `.mp3` twin yet
    async fn convert_m4a_files(&self, input_dir: &Path, summary: &mut RunSummary) -> Result<usize> {
        let mut converted = 0;

        for source in FileManager::find_files(input_dir, "m4a")? {
            let target = source.with_extension("mp3");
            if FileManager::file_exists(&target) {
                continue;
            }

            let filename = naming::path_filename(&source);
            info!("Converting {} to mp3", filename);
            match self
                .with_retries(&format!("transcode {}", filename), || self.codec.transcode(&source, &target))
                .await
            {
                Ok(()) => converted += 1,
                Err(e) => {
                    error!("Failed to convert {}: {}", filename, e);
                    summary.record_failure(filename, &e);
                }
            }
        }

        Ok(converted)
    }

    async fn cut_episode(&self, episode: &Path, output_dir: &Path, window: u32, overlap: u32) -> AppResult<usize> {
        let filename = naming::path_filename(episode);
        let (stem, extension) = naming::split_stem(&filename);

        let duration = self
            .with_retries(&format!("probe {}", filename), || self.codec.probe(episode))
            .await?;
        let ranges = planner::plan(duration, window, overlap)?;
        if ranges.is_empty() {
            warn!("{} has no audio to cut", filename);
            return Ok(0);
        }

        // Check the widest name before writing anything
        let total = u32::try_from(ranges.len()).unwrap_or(u32::MAX);
        naming::encode(stem, total, total)?;

        Self::remove_previous_segments(output_dir, stem, extension)?;

        let mut written = Vec::with_capacity(ranges.len());
        for (ordinal, range) in (1..=total).zip(ranges.iter()) {
            let output = output_dir.join(naming::untitled_filename(&naming::segment_filename(
                stem, ordinal, total, extension,
            )?));
            let outcome = self
                .with_retries(&format!("cut {} part {}", filename, ordinal), || {
                    self.cut_segment(episode, range, &output)
                })
                .await;

            // A failed cut may still have created its file
            written.push(output);
            if let Err(e) = outcome {
                Self::remove_partial_segments(&written);
                return Err(e);
            }
        }

        Ok(written.len())
    }

    /// Cut one range, dropping whatever an earlier failed attempt left at `output`
    async fn cut_segment(&self, episode: &Path, range: &TimeRange, output: &Path) -> AppResult<()> {
        if output.exists() {
            std::fs::remove_file(output).map_err(|e| MediaError::io(output, e))?;
        }
        self.codec.cut(episode, range.start, range.length(), output).await?;
        Ok(())
    }

    /// Remove the titled and untitled segments of `stem` left in `output_dir` by an earlier run
    fn remove_previous_segments(output_dir: &Path, stem: &str, extension: &str) -> AppResult<()> {
        let entries = std::fs::read_dir(output_dir).map_err(|e| MediaError::io(output_dir, e))?;

        for entry in entries {
            let path = entry.map_err(|e| MediaError::io(output_dir, e))?.path();
            if !path.is_file() {
                continue;
            }

            let name = naming::path_filename(&path);
            let segment_name = naming::titled_filename(&name).unwrap_or_else(|| name.clone());
            let same_extension = naming::split_stem(&segment_name).1 == extension;
            if let Ok(segment) = naming::decode(&segment_name) {
                if same_extension && segment.stem == stem {
                    debug!("Removing {} left by an earlier run", name);
                    std::fs::remove_file(&path).map_err(|e| MediaError::io(&path, e))?;
                }
            }
        }
        Ok(())
    }

    async fn title_segment(&self, untitled: &Path, destination: &Path, feed: &FeedIndex) -> AppResult<String> {
        let filename = naming::path_filename(destination);
        let title = titles::resolve(&filename, feed)?;
        self.with_retries(&format!("title {}", filename), || {
            self.titler.title_into(untitled, destination, &title)
        })
        .await?;
        Ok(title)
    }

    async fn probe_into_feed(&self, episode: &Path, filename: &str, feed: &mut FeedIndex) -> AppResult<String> {
        // Look the episode up first so unlisted files are not probed
        feed.lookup(filename)?;

        let seconds = self
            .with_retries(&format!("probe {}", filename), || self.codec.probe(episode))
            .await?;
        let formatted = feed::format_duration(seconds);
        feed.set_duration(filename, &formatted)?;
        Ok(formatted)
    }

    /// Run `operation`, retrying external tool failures up to `tool_retries` times
    async fn with_retries<T, E, F, Fut>(&self, action: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<AppError>,
    {
        let attempts = self.config.media.tool_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            let outcome: AppResult<T> = operation().await.map_err(Into::into);
            match outcome {
                Ok(value) => return Ok(value),
                Err(AppError::Media(e)) if attempt < attempts => {
                    warn!("{} failed (attempt {}/{}): {}", action, attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn remove_partial_segments(segments: &[PathBuf]) {
        for segment in segments.iter().filter(|segment| segment.exists()) {
            if let Err(e) = std::fs::remove_file(segment) {
                warn!("Failed to remove partial segment {}: {}", segment.display(), e);
            }
        }
    }

    fn progress_bar(length: usize, unit: &str) -> ProgressBar {
        let progress_bar = ProgressBar::new(length as u64);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Append the summary and failures of a run to the issues file of `output_dir`
    fn write_issues(&self, output_dir: &Path, summary: &RunSummary, context: &str) {
        if summary.is_success() && summary.skipped_episodes.is_empty() {
            return;
        }

        let mut content = format!("{} - {}", context, summary.summary());
        for skipped in &summary.skipped_episodes {
            content.push_str(&format!("\n[SKIPPED] {}", skipped));
        }
        for failure in &summary.failures {
            content.push_str(&format!("\n[ERROR] {}", failure));
        }

        let log_file_path = output_dir.join(ISSUES_LOG_FILENAME);
        match FileManager::append_to_log_file(&log_file_path, &content) {
            Ok(()) => info!("Issues written to {}", log_file_path.display()),
            Err(e) => warn!("Failed to write issues file: {}", e),
        }
    }

    // Format duration in a human-readable format
    fn format_elapsed(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
