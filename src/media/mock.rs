/*!
 * Mock media collaborators for testing.
 *
 * Fake "audio" files are plain text holding their duration in seconds, so the
 * whole pipeline can run against a temporary directory without ffmpeg:
 * - `MockCodec::working()` - probes, cuts and concatenates durations
 * - `MockCodec::failing(op)` - always fails the given operation
 * - `MockCodec::failing_times(op, n)` - fails the first `n` calls of an operation
 * - `MockCodec::interrupted(op, n)` - the `n`th call writes a truncated output, then fails
 * - `MockSpeech::working()` / `MockSpeech::failing()`
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::MediaError;
use crate::media::{AudioCodec, SpeechSynthesizer};

/// Seconds of speech produced per character by `MockSpeech`
pub const SPEECH_SECONDS_PER_CHAR: f64 = 0.05;

/// Codec operation, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Probe,
    Cut,
    Concatenate,
    Transcode,
}

/// Write a fake audio file lasting `seconds`
pub fn write_fake_audio<P: AsRef<Path>>(path: P, seconds: f64) -> std::io::Result<()> {
    fs::write(path, format!("{:.3}", seconds))
}

/// Read the duration of a fake audio file
pub fn read_fake_audio<P: AsRef<Path>>(path: P) -> Result<f64, MediaError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| MediaError::io(path, e))?;
    content
        .trim()
        .parse::<f64>()
        .map_err(|_| MediaError::tool_failure("mock-codec", path.display(), "not a fake audio file"))
}

#[derive(Debug, Default)]
struct CodecState {
    calls: HashMap<MockOperation, usize>,
    failures_left: HashMap<MockOperation, usize>,
    interrupted_calls: HashMap<MockOperation, usize>,
    log: Vec<String>,
}

/// File-backed fake [`AudioCodec`]
#[derive(Debug, Default)]
pub struct MockCodec {
    state: Mutex<CodecState>,
}

impl MockCodec {
    /// A codec whose every operation succeeds
    pub fn working() -> Self {
        Self::default()
    }

    /// A codec that always fails `operation`
    pub fn failing(operation: MockOperation) -> Self {
        Self::failing_times(operation, usize::MAX)
    }

    /// A codec that fails the first `times` calls of `operation`
    pub fn failing_times(operation: MockOperation, times: usize) -> Self {
        let codec = Self::default();
        if let Ok(mut state) = codec.state.lock() {
            state.failures_left.insert(operation, times);
        }
        codec
    }

    /// A codec whose `call`th call of `operation` (one-based) leaves a truncated
    /// output behind and then fails, like a tool killed mid-write
    pub fn interrupted(operation: MockOperation, call: usize) -> Self {
        let codec = Self::default();
        if let Ok(mut state) = codec.state.lock() {
            state.interrupted_calls.insert(operation, call);
        }
        codec
    }

    /// Number of calls made to `operation`, failed ones included
    pub fn calls(&self, operation: MockOperation) -> usize {
        self.state
            .lock()
            .map(|state| state.calls.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Human readable trace of the calls, in order
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().map(|state| state.log.clone()).unwrap_or_default()
    }

    /// Count the call; `Ok(true)` when it must be interrupted after writing its output
    fn record(&self, operation: MockOperation, description: String) -> Result<bool, MediaError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MediaError::tool_failure("mock-codec", &description, "state lock poisoned"))?;
        let calls = state.calls.entry(operation).or_insert(0);
        *calls += 1;
        let call = *calls;
        state.log.push(description.clone());

        if let Some(left) = state.failures_left.get_mut(&operation) {
            if *left > 0 {
                *left -= 1;
                return Err(MediaError::tool_failure("mock-codec", description, "injected failure"));
            }
        }
        Ok(state.interrupted_calls.get(&operation) == Some(&call))
    }

    /// Write `seconds` of fake audio, or a truncated file and a failure when `interrupted`
    fn finish(output: &Path, seconds: f64, interrupted: bool) -> Result<(), MediaError> {
        if interrupted {
            write_fake_audio(output, seconds / 2.0).map_err(|e| MediaError::io(output, e))?;
            return Err(MediaError::tool_failure("mock-codec", output.display(), "interrupted while writing"));
        }
        write_fake_audio(output, seconds).map_err(|e| MediaError::io(output, e))
    }
}

#[async_trait]
impl AudioCodec for MockCodec {
    async fn probe(&self, path: &Path) -> Result<f64, MediaError> {
        self.record(MockOperation::Probe, format!("probe {}", path.display()))?;
        read_fake_audio(path)
    }

    async fn cut(&self, input: &Path, start: u64, length: u64, output: &Path) -> Result<(), MediaError> {
        let interrupted = self.record(
            MockOperation::Cut,
            format!("cut {} {}+{} -> {}", input.display(), start, length, output.display()),
        )?;
        let available = read_fake_audio(input)?;
        let clip = (available - start as f64).clamp(0.0, length as f64);
        Self::finish(output, clip, interrupted)
    }

    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MediaError> {
        let interrupted = self.record(
            MockOperation::Concatenate,
            format!("concatenate {} inputs -> {}", inputs.len(), output.display()),
        )?;
        let mut total = 0.0;
        for input in inputs {
            total += read_fake_audio(input)?;
        }
        Self::finish(output, total, interrupted)
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        let interrupted = self.record(
            MockOperation::Transcode,
            format!("transcode {} -> {}", input.display(), output.display()),
        )?;
        let seconds = read_fake_audio(input)?;
        Self::finish(output, seconds, interrupted)
    }
}

/// Fake [`SpeechSynthesizer`] producing fake audio proportional to the text length
#[derive(Debug, Default)]
pub struct MockSpeech {
    fail: bool,
    spoken: Mutex<Vec<(String, String)>>,
}

impl MockSpeech {
    pub fn working() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Texts and languages received so far
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.spoken.lock().map(|spoken| spoken.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, MediaError> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push((text.to_string(), language.to_string()));
        }
        if self.fail {
            return Err(MediaError::tool_failure("mock-speech", text, "injected failure"));
        }
        let seconds = text.chars().count() as f64 * SPEECH_SECONDS_PER_CHAR;
        Ok(format!("{:.3}", seconds).into_bytes())
    }
}
