//! Crash-dump directories and their captured kernel logs.
//!
//! kdump writes one subdirectory per crash under the crash root, each holding
//! the kernel log extracted from the vmcore.

use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::TriageError;
use crate::kernel_log::{call_trace_blocks, CallTraceBlocks};

/// Where kdump stores crash directories by default
pub const DEFAULT_CRASH_ROOT: &str = "/var/crash";

/// Name of the kernel log inside each crash directory
pub const CRASH_LOG_FILE: &str = "vmcore-dmesg.txt";

/// A crash directory found under the crash root
#[derive(Debug, Clone, Serialize)]
pub struct CrashDirectory {
    pub name: String,
    pub path: PathBuf,
    pub has_log: bool,
}

/// List crash directories under `root`, sorted by name.
///
/// # Errors
/// Returns `NoCrashDirectories` if the root cannot be read or holds no
/// subdirectories.
pub fn list_crash_directories(root: &Path) -> Result<Vec<CrashDirectory>, TriageError> {
    let entries = fs::read_dir(root).map_err(|e| {
        warn!("Failed to read crash root {}: {e}", root.display());
        TriageError::NoCrashDirectories(root.to_path_buf())
    })?;

    let mut dirs: Vec<CrashDirectory> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| {
            let path = entry.path();
            let has_log = path.join(CRASH_LOG_FILE).is_file();
            CrashDirectory { name: entry.file_name().to_string_lossy().into_owned(), path, has_log }
        })
        .collect();

    if dirs.is_empty() {
        return Err(TriageError::NoCrashDirectories(root.to_path_buf()));
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    info!("Found {} crash directories under {}", dirs.len(), root.display());
    Ok(dirs)
}

/// Path of the kernel log for crash directory `name`
#[must_use]
pub fn crash_log_path(root: &Path, name: &str) -> PathBuf {
    root.join(name).join(CRASH_LOG_FILE)
}

/// Captured kernel log of one crash directory. Immutable once read.
#[derive(Debug, Clone)]
pub struct CrashLog {
    directory: String,
    path: PathBuf,
    text: String,
}

impl CrashLog {
    /// Read the log of crash directory `name` under `root`.
    ///
    /// Invalid UTF-8 (binary garbage is common in console captures) is replaced
    /// rather than rejected.
    ///
    /// # Errors
    /// Returns `LogUnreadable` if the file is missing or cannot be read.
    pub fn load(root: &Path, name: &str) -> Result<Self, TriageError> {
        let path = crash_log_path(root, name);
        let bytes = fs::read(&path)
            .map_err(|source| TriageError::LogUnreadable { path: path.clone(), source })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        info!("Loaded {} ({} bytes)", path.display(), text.len());
        Ok(Self { directory: name.to_string(), path, text })
    }

    /// Build a log from text already in memory
    pub fn from_text(directory: impl Into<String>, text: impl Into<String>) -> Self {
        let directory = directory.into();
        Self { path: PathBuf::from(&directory).join(CRASH_LOG_FILE), directory, text: text.into() }
    }

    #[must_use]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Call-trace blocks delimited by `marker`, in file order
    #[must_use]
    pub fn call_trace_blocks<'a>(&'a self, marker: &'a str) -> CallTraceBlocks<'a> {
        call_trace_blocks(&self.text, marker)
    }
}
