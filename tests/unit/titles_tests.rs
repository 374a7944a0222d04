/*!
 * Tests for the segment titling pipeline
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use podsplit::errors::{AppError, MediaError};
use podsplit::media::mock::{MockCodec, MockOperation, MockSpeech, SPEECH_SECONDS_PER_CHAR};
use podsplit::titles::{self, SegmentTitler};
use crate::common;

fn titler(codec: &Arc<MockCodec>, speech: &Arc<MockSpeech>) -> SegmentTitler {
    SegmentTitler::new(codec.clone(), speech.clone(), "fr-FR")
}

/// Test that the title is spoken then placed before the segment audio
#[tokio::test]
async fn test_apply_title_shouldPrependSpokenTitle() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let segment = common::write_episode(temp_dir.path(), "ep1_part_01_of_03.mp3", 3.0)?;
    let codec = Arc::new(MockCodec::working());
    let speech = Arc::new(MockSpeech::working());

    let title = "Part 1 of 3 of Episode 5/10";
    titler(&codec, &speech).apply_title(&segment, title).await?;

    let spoken = speech.spoken();
    assert_eq!(spoken, vec![("Part 1 of 3 of Episode 5 sur 10".to_string(), "fr-FR".to_string())]);

    let title_seconds = spoken[0].0.chars().count() as f64 * SPEECH_SECONDS_PER_CHAR;
    common::assert_seconds(common::fake_duration(&segment), title_seconds + 3.0);

    assert_eq!(codec.calls(MockOperation::Transcode), 1);
    assert_eq!(codec.calls(MockOperation::Concatenate), 1);
    assert_eq!(common::file_names(temp_dir.path()), vec!["ep1_part_01_of_03.mp3"]);
    Ok(())
}

/// Test that titling an untitled segment gives it its final name
#[tokio::test]
async fn test_title_into_shouldReplaceUntitledSegment() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let untitled = common::write_episode(temp_dir.path(), "ep1_part_01_of_02.untitled.mp3", 3.0)?;
    let destination = temp_dir.path().join("ep1_part_01_of_02.mp3");
    let codec = Arc::new(MockCodec::working());
    let speech = Arc::new(MockSpeech::working());

    titler(&codec, &speech)
        .title_into(&untitled, &destination, "Part 1 of 2 of Sample")
        .await?;

    let title_seconds = "Part 1 of 2 of Sample".chars().count() as f64 * SPEECH_SECONDS_PER_CHAR;
    common::assert_seconds(common::fake_duration(&destination), title_seconds + 3.0);
    assert_eq!(common::file_names(temp_dir.path()), vec!["ep1_part_01_of_02.mp3"]);
    Ok(())
}

/// Test that an interrupted concatenation keeps the untitled segment and drops the partial output
#[tokio::test]
async fn test_title_into_withInterruptedConcatenation_shouldKeepUntitledSegment() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let untitled = common::write_episode(temp_dir.path(), "ep1_part_02_of_02.untitled.mp3", 1.5)?;
    let destination = temp_dir.path().join("ep1_part_02_of_02.mp3");
    let codec = Arc::new(MockCodec::interrupted(MockOperation::Concatenate, 1));
    let speech = Arc::new(MockSpeech::working());

    let result = titler(&codec, &speech)
        .title_into(&untitled, &destination, "Part 2 of 2 of Sample")
        .await;

    assert!(result.is_err());
    common::assert_seconds(common::fake_duration(&untitled), 1.5);
    assert_eq!(common::file_names(temp_dir.path()), vec!["ep1_part_02_of_02.untitled.mp3"]);
    Ok(())
}

/// Test that a failed synthesis leaves the segment as it was
#[test]
fn test_apply_title_withFailingSpeech_shouldLeaveSegmentUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let segment = common::write_episode(temp_dir.path(), "ep1_part_02_of_03.mp3", 3.0)?;
    let before = fs::read(&segment)?;
    let codec = Arc::new(MockCodec::working());
    let speech = Arc::new(MockSpeech::failing());

    let result = tokio_test::block_on(titler(&codec, &speech).apply_title(&segment, "Part 2 of 3 of Sample"));

    assert!(matches!(result, Err(AppError::Media(MediaError::ExternalToolFailure { .. }))));
    assert_eq!(fs::read(&segment)?, before);
    assert_eq!(codec.calls(MockOperation::Concatenate), 0);
    assert_eq!(common::file_names(temp_dir.path()), vec!["ep1_part_02_of_03.mp3"]);
    Ok(())
}

/// Test that a failed concatenation leaves the segment and no scratch files
#[tokio::test]
async fn test_apply_title_withFailingConcatenation_shouldCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let segment = common::write_episode(temp_dir.path(), "ep1_part_03_of_03.mp3", 1.02)?;
    let codec = Arc::new(MockCodec::failing(MockOperation::Concatenate));
    let speech = Arc::new(MockSpeech::working());

    let result = titler(&codec, &speech).apply_title(&segment, "Part 3 of 3 of Sample").await;

    assert!(result.is_err());
    common::assert_seconds(common::fake_duration(&segment), 1.02);
    assert_eq!(common::file_names(temp_dir.path()), vec!["ep1_part_03_of_03.mp3"]);
    Ok(())
}

/// Test that a missing segment is reported without calling any tool
#[tokio::test]
async fn test_apply_title_withMissingSegment_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let codec = Arc::new(MockCodec::working());
    let speech = Arc::new(MockSpeech::working());

    let result = titler(&codec, &speech)
        .apply_title(&temp_dir.path().join("gone_part_01_of_01.mp3"), "Part 1 of 1 of Gone")
        .await;

    assert!(matches!(result, Err(AppError::Media(MediaError::Io { .. }))));
    assert!(speech.spoken().is_empty());
    Ok(())
}

/// Test the title format
#[test]
fn test_format_title_shouldStateOrdinalTotalAndEpisode() {
    assert_eq!(titles::format_title(2, 3, "Sample file"), "Part 2 of 3 of Sample file");
}
