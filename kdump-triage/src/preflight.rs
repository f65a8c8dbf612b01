//! Pre-flight checks for kdump-triage
//!
//! Validates the environment before any crash log is touched.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use log::warn;
use object::{Object, ObjectSection};
use std::path::{Path, PathBuf};

use crate::domain::TriageError;

/// Checks shared by every subcommand
///
/// # Errors
/// `UnsupportedPlatform` on non-POSIX hosts.
pub fn run_preflight_checks(debugger: &str, quiet: bool) -> Result<(), TriageError> {
    check_platform()?;
    check_debugger(debugger, quiet);
    Ok(())
}

/// The pipeline relies on POSIX paths and process semantics
///
/// # Errors
/// Returns `UnsupportedPlatform` on non-POSIX hosts.
pub fn check_platform() -> Result<(), TriageError> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(TriageError::UnsupportedPlatform(std::env::consts::OS))
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

/// Check that the crash root exists and can be listed.
/// Only subcommands that open a crash log need this.
///
/// # Errors
/// Fails with a hint when the root is missing or not readable.
pub fn check_crash_root(crash_root: &Path) -> Result<()> {
    if !crash_root.exists() {
        bail!(
            "Crash root not found: {}\n\n\
             Is kdump configured? Point --crash-root at the directory holding crash dumps.",
            crash_root.display()
        );
    }

    match std::fs::read_dir(crash_root) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && !is_root() => bail!(
            "Permission denied reading {}\n\n\
             Crash dumps are usually readable by root only. Run with: sudo kdump-triage ...",
            crash_root.display()
        ),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to read crash root {}", crash_root.display()))
        }
    }
}

/// Warn early when the debugger cannot be found; resolution reports it per request
fn check_debugger(debugger: &str, quiet: bool) {
    if quiet {
        return;
    }
    if find_in_path(debugger).is_none() {
        eprintln!("warning: debugger '{debugger}' not found, source resolution will fail");
    }
}

/// Locate `program` the way the shell would
#[must_use]
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).map(|dir| dir.join(program)).find(|candidate| candidate.is_file())
}

/// Check a module binary for DWARF line information.
///
/// Without `.debug_info` the debugger cannot map symbols to lines; this only
/// warns, since the debugger has the final say.
pub fn check_debug_info(binary: &Path) -> bool {
    let Ok(file_data) = std::fs::read(binary) else {
        return false;
    };

    let Ok(obj) = object::File::parse(&*file_data) else {
        warn!("{} is not a valid ELF object", binary.display());
        return false;
    };

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    if !has_debug_info {
        warn!(
            "{} has no DWARF debug info, rebuild the module with CONFIG_DEBUG_INFO",
            binary.display()
        );
    }
    has_debug_info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_supported() {
        assert!(check_platform().is_ok());
    }

    #[test]
    fn test_crash_root_not_found() {
        let result = check_crash_root(Path::new("/nonexistent/var/crash"));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Crash root not found"));
    }

    #[test]
    fn test_preflight_ignores_crash_root() {
        assert!(run_preflight_checks("/bin/sh", true).is_ok());
    }

    #[test]
    fn test_find_in_path() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("/bin/sh").is_some());
        assert!(find_in_path("definitely-not-a-debugger-xyz").is_none());
    }

    #[test]
    fn test_debug_info_on_non_elf() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.ko");
        std::fs::write(&fake, b"not an elf").unwrap();
        assert!(!check_debug_info(&fake));
        assert!(!check_debug_info(&dir.path().join("missing.ko")));
    }
}
