use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::SpeechConfig;
use crate::errors::MediaError;
use crate::media::{run_tool, SpeechSynthesizer};

// @module: pico2wave speech synthesis

const ENGINE_NAME: &str = "pico2wave";

/// Process-wide speech engine, resolved on first synthesis
#[derive(Debug)]
struct PicoEngine {
    program: String,
}

static ENGINE: OnceCell<PicoEngine> = OnceCell::new();

// @initializes: Global engine on first use
async fn engine(program: &str, timeout: Duration) -> Result<&'static PicoEngine, MediaError> {
    if let Some(engine) = ENGINE.get() {
        if engine.program != program {
            debug!("Speech engine already loaded from {}, ignoring {}", engine.program, program);
        }
        return Ok(engine);
    }

    // The engine has no usage flag that exits cleanly, spawning it is the check
    let check = Command::new(program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    tokio::select! {
        result = check => {
            result.map_err(|e| MediaError::tool_failure(ENGINE_NAME, program, format!("speech engine unavailable: {}", e)))?;
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::Timeout {
                tool: ENGINE_NAME.to_string(),
                target: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    }

    let engine = ENGINE.get_or_init(|| {
        info!("Speech engine ready: {}", program);
        PicoEngine {
            program: program.to_string(),
        }
    });
    Ok(engine)
}

/// [`SpeechSynthesizer`] backed by the SVOX pico `pico2wave` command
#[derive(Debug, Clone)]
pub struct PicoTts {
    config: SpeechConfig,
    timeout: Duration,
}

impl PicoTts {
    pub fn new(config: SpeechConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

#[async_trait]
impl SpeechSynthesizer for PicoTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, MediaError> {
        let engine = engine(&self.config.engine_path, self.timeout).await?;

        // pico2wave picks its output format from the file extension
        let wav = tempfile::Builder::new()
            .prefix("podsplit-title")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| MediaError::io(std::env::temp_dir(), e))?;
        let wav_path: PathBuf = wav.path().to_path_buf();

        let args = vec![
            "-l".to_string(),
            language.to_string(),
            "-w".to_string(),
            wav_path.to_string_lossy().to_string(),
            text.to_string(),
        ];
        run_tool(&engine.program, &args, &wav_path, self.timeout).await?;

        let bytes = tokio::fs::read(&wav_path)
            .await
            .map_err(|e| MediaError::io(&wav_path, e))?;
        if bytes.is_empty() {
            return Err(MediaError::tool_failure(ENGINE_NAME, text, "no audio produced"));
        }

        debug!("Synthesized {} bytes for '{}'", bytes.len(), text);
        Ok(bytes)
    }
}
