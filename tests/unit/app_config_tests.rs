/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use podsplit::app_config::{Config, LogLevel};
use crate::common;

/// Test the default configuration values
#[test]
fn test_default_config_shouldHaveTenMinutePartsInFrench() {
    let config = Config::default();

    assert_eq!(config.window_seconds, 600);
    assert_eq!(config.overlap_seconds, 10);
    assert_eq!(config.feed_filename, "rss.xml");
    assert_eq!(config.media.ffmpeg_path, "ffmpeg");
    assert_eq!(config.media.ffprobe_path, "ffprobe");
    assert_eq!(config.media.tool_timeout_secs, 600);
    assert_eq!(config.media.tool_retries, 1);
    assert_eq!(config.speech.engine_path, "pico2wave");
    assert_eq!(config.speech.language, "fr-FR");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test that a zero window is rejected
#[test]
fn test_validate_withZeroWindow_shouldFail() {
    let mut config = Config::default();
    config.window_seconds = 0;
    assert!(config.validate().is_err());
}

/// Test that empty tool settings are rejected
#[test]
fn test_validate_withEmptyToolSettings_shouldFail() {
    let mut config = Config::default();
    config.media.ffprobe_path = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.speech.language = String::new();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.media.tool_timeout_secs = 0;
    assert!(config.validate().is_err());
}

/// Test that missing fields take their defaults
#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "window_seconds": 300, "speech": { "language": "en-US" }, "log_level": "debug" }"#,
    )?;

    let config = Config::from_file(&path)?;

    assert_eq!(config.window_seconds, 300);
    assert_eq!(config.overlap_seconds, 10);
    assert_eq!(config.speech.language, "en-US");
    assert_eq!(config.speech.engine_path, "pico2wave");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

/// Test saving then loading a configuration
#[test]
fn test_save_thenFromFile_shouldKeepValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.overlap_seconds = 3;
    config.media.tool_retries = 4;
    config.media.mp3_bitrate = "128k".to_string();
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.overlap_seconds, 3);
    assert_eq!(loaded.media, config.media);
    assert_eq!(loaded.speech, config.speech);
    Ok(())
}

/// Test that a broken file names the file in the error
#[test]
fn test_from_file_withInvalidJson_shouldNameFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ window_seconds: ")?;

    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
    Ok(())
}
