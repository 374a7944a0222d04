use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::naming;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Files with a specific extension directly inside `dir`, sorted by name.
    ///
    /// Sub-directories are not visited, which keeps scratch directories out of
    /// the listing.
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(wanted) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Copy `path` to `<stem>_<yymmdd_HHMMSS>.<ext>` next to it.
    ///
    /// Returns the backup path, or `None` when there was nothing to back up.
    pub fn backup_file<P: AsRef<Path>>(path: P, timestamp: DateTime<Local>) -> Result<Option<PathBuf>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let filename = naming::path_filename(path);
        let (stem, extension) = naming::split_stem(&filename);
        let backup_name = naming::join_stem(&format!("{}_{}", stem, timestamp.format("%y%m%d_%H%M%S")), extension);
        let backup = path.with_file_name(backup_name);

        fs::copy(path, &backup)
            .with_context(|| format!("Failed to back up {:?} to {:?}", path, backup))?;
        Ok(Some(backup))
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Get current timestamp
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        // Open file in append mode, create if it doesn't exist
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        // Write content with timestamp
        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
