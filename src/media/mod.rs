/*!
 * External media collaborators.
 *
 * The pipeline never touches audio samples itself. Probing, cutting,
 * concatenating and transcoding go through an [`AudioCodec`], and spoken
 * titles come from a [`SpeechSynthesizer`]:
 * - `ffmpeg`: [`AudioCodec`] backed by the ffmpeg/ffprobe executables
 * - `speech`: [`SpeechSynthesizer`] backed by pico2wave
 * - `mock`: file-backed fakes used by the test suite
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use log::debug;
use tokio::process::Command;

use crate::errors::MediaError;

/// Audio operations delegated to an external codec tool
#[async_trait]
pub trait AudioCodec: Send + Sync + Debug {
    /// Duration of a media file in seconds
    async fn probe(&self, path: &Path) -> Result<f64, MediaError>;

    /// Write `length` seconds of `input` starting at `start` to `output`.
    ///
    /// A range running past the end of the input yields a shorter clip.
    async fn cut(&self, input: &Path, start: u64, length: u64, output: &Path) -> Result<(), MediaError>;

    /// Re-encode `inputs`, in order, into a single `output`
    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MediaError>;

    /// Convert any supported audio file to mp3
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError>;
}

/// Text-to-speech engine
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Render `text` in `language` and return the WAV bytes
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, MediaError>;
}

/// Run an external tool to completion, failing on timeout or non-zero exit.
///
/// `target` names the file being processed in error messages.
pub(crate) async fn run_tool(
    program: &str,
    args: &[String],
    target: &Path,
    timeout: Duration,
) -> Result<Output, MediaError> {
    debug!("Running {} {}", program, args.join(" "));

    let tool_future = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        result = tool_future => {
            result.map_err(|e| MediaError::tool_failure(program, target.display(), format!("cannot run {}: {}", program, e)))?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::Timeout {
                tool: program.to_string(),
                target: target.display().to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::tool_failure(
            program,
            target.display(),
            ffmpeg::filter_ffmpeg_stderr(&stderr),
        ));
    }

    Ok(output)
}

pub mod ffmpeg;
pub mod mock;
pub mod speech;

pub use ffmpeg::FfmpegCodec;
pub use speech::PicoTts;
