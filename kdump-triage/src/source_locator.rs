//! Find a source file by base name under a driver source tree.
//!
//! The debugger reports paths relative to the tree the module was built in,
//! which rarely matches the local checkout, so the file is looked up by name.
//! Traversal is depth-first in filesystem enumeration order and the first
//! match wins; when two files share a base name the result depends on that
//! order.

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::domain::TriageError;

/// Shared flag that aborts a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear the flag so the token can be reused for the next request
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Search `root` for a regular file named `file_name`.
///
/// Symlinks are followed; loops and unreadable entries are skipped.
///
/// # Errors
/// `FileNotFound` when the tree is exhausted, `Cancelled` when `cancel` is set.
pub fn find_source_file(
    root: &Path,
    file_name: &str,
    cancel: &CancelToken,
) -> Result<PathBuf, TriageError> {
    for entry in WalkDir::new(root).follow_links(true) {
        if cancel.is_cancelled() {
            info!("Search for {file_name} under {} cancelled", root.display());
            return Err(TriageError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping entry: {e}");
                continue;
            }
        };

        if entry.file_type().is_file() && entry.file_name() == file_name {
            info!("Found {file_name} at {}", entry.path().display());
            return Ok(entry.into_path());
        }
    }

    Err(TriageError::FileNotFound { file: file_name.to_string(), root: root.to_path_buf() })
}
