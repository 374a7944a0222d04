/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use chrono::{Local, TimeZone};
use std::fs;
use podsplit::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::dir_exists(&test_file));
    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that ensure_dir creates nested directories
#[test]
fn test_ensure_dir_withNestedPath_shouldCreateAll() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b");

    FileManager::ensure_dir(&nested)?;
    FileManager::ensure_dir(&nested)?;

    assert!(FileManager::dir_exists(&nested));
    Ok(())
}

/// Test that find_files lists matching files only, sorted, without recursion
#[test]
fn test_find_files_shouldBeSortedAndShallow() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "b.mp3", "1")?;
    common::create_test_file(dir, "a.MP3", "1")?;
    common::create_test_file(dir, "c.m4a", "1")?;
    common::create_test_file(dir, "rss.xml", "<rss/>")?;
    fs::create_dir(dir.join("nested"))?;
    common::create_test_file(&dir.join("nested"), "d.mp3", "1")?;

    let found: Vec<String> = FileManager::find_files(dir, "mp3")?
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(found, vec!["a.MP3", "b.mp3"]);
    assert_eq!(FileManager::find_files(dir, ".m4a")?.len(), 1);
    Ok(())
}

/// Test that backup_file copies to a timestamped name
#[test]
fn test_backup_file_shouldCopyWithTimestamp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let feed = common::create_test_file(temp_dir.path(), "rss.xml", "<rss/>")?;
    let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

    let backup = FileManager::backup_file(&feed, timestamp)?.expect("a backup");

    assert_eq!(backup.file_name().unwrap(), "rss_240309_140507.xml");
    assert_eq!(fs::read_to_string(&backup)?, "<rss/>");
    assert!(feed.exists());
    Ok(())
}

/// Test that backing up a missing file does nothing
#[test]
fn test_backup_file_withMissingFile_shouldReturnNone() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let backup = FileManager::backup_file(temp_dir.path().join("rss.xml"), Local::now())?;
    assert!(backup.is_none());
    Ok(())
}

/// Test that append_to_log_file keeps previous entries
#[test]
fn test_append_to_log_file_shouldAppendTimestampedLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log_path = temp_dir.path().join("logs").join("podsplit.issues.log");

    FileManager::append_to_log_file(&log_path, "first")?;
    FileManager::append_to_log_file(&log_path, "second")?;

    let content = fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));
    Ok(())
}
