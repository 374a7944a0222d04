use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::MediaConfig;
use crate::errors::MediaError;
use crate::media::{run_tool, AudioCodec};

// @module: ffmpeg/ffprobe backed audio codec

// @const: Banner, build configuration and stream metadata lines printed by ffmpeg
static NOISE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(ffmpeg version|ffprobe version|built with|configuration:|lib[a-z]+\s+\d|Input #|Output #|Metadata:|Duration:|Stream #|Stream mapping:|Press \[q\]|size=)",
    )
    .expect("noise pattern is valid")
});

/// Strip ffmpeg's banner and metadata noise from stderr, keeping the error lines
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.trim().is_empty() && !NOISE_REGEX.is_match(line))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// [`AudioCodec`] that shells out to ffmpeg and ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    config: MediaConfig,
}

impl FfmpegCodec {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.tool_timeout_secs)
    }

    fn mp3_output_args(&self, output: &Path) -> Vec<String> {
        vec![
            "-vn".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-b:a".to_string(),
            self.config.mp3_bitrate.clone(),
            path_arg(output),
        ]
    }

    async fn ffmpeg(&self, mut args: Vec<String>, target: &Path) -> Result<(), MediaError> {
        let mut full_args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];
        full_args.append(&mut args);
        run_tool(&self.config.ffmpeg_path, &full_args, target, self.timeout()).await?;
        Ok(())
    }
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    async fn probe(&self, path: &Path) -> Result<f64, MediaError> {
        if !path.exists() {
            return Err(MediaError::tool_failure(&self.config.ffprobe_path, path.display(), "file does not exist"));
        }

        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            path_arg(path),
        ];
        let output = run_tool(&self.config.ffprobe_path, &args, path, self.timeout()).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: Value = serde_json::from_str(&stdout).map_err(|e| {
            MediaError::tool_failure(&self.config.ffprobe_path, path.display(), format!("unreadable JSON output: {}", e))
        })?;

        json.get("format")
            .and_then(|format| format.get("duration"))
            .and_then(|duration| duration.as_str())
            .and_then(|duration| duration.trim().parse::<f64>().ok())
            .ok_or_else(|| MediaError::tool_failure(&self.config.ffprobe_path, path.display(), "no format duration reported"))
    }

    async fn cut(&self, input: &Path, start: u64, length: u64, output: &Path) -> Result<(), MediaError> {
        let mut args = vec![
            "-ss".to_string(),
            start.to_string(),
            "-i".to_string(),
            path_arg(input),
            "-t".to_string(),
            length.to_string(),
        ];
        args.extend(self.mp3_output_args(output));
        self.ffmpeg(args, input).await
    }

    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MediaError> {
        if inputs.is_empty() {
            return Err(MediaError::tool_failure(&self.config.ffmpeg_path, output.display(), "nothing to concatenate"));
        }

        // Inputs may differ in rate and layout (speech is mono 16 kHz),
        // so every stream is normalized before the concat filter
        let mut args = Vec::with_capacity(inputs.len() * 2 + 12);
        let mut filter = String::new();
        for (index, input) in inputs.iter().enumerate() {
            args.push("-i".to_string());
            args.push(path_arg(input));
            filter.push_str(&format!(
                "[{index}:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=stereo[a{index}];"
            ));
        }
        for index in 0..inputs.len() {
            filter.push_str(&format!("[a{index}]"));
        }
        filter.push_str(&format!("concat=n={}:v=0:a=1[out]", inputs.len()));

        args.push("-filter_complex".to_string());
        args.push(filter);
        args.push("-map".to_string());
        args.push("[out]".to_string());
        args.extend(self.mp3_output_args(output));
        self.ffmpeg(args, output).await
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        let mut args = vec!["-i".to_string(), path_arg(input)];
        args.extend(self.mp3_output_args(output));
        self.ffmpeg(args, input).await
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
