//! Structured error types for kdump-triage
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Every variant is recoverable: a failed request never invalidates a
//! selection that already completed.

use super::types::ModuleName;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("No crash directories found under {0}")]
    NoCrashDirectories(PathBuf),

    #[error("Cannot read crash log {path}: {source}")]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No call trace found in crash log")]
    NoCallTraceFound,

    #[error(
        "Crash did not occur in any known driver (no module-tagged frame after the register dump)"
    )]
    UnknownFaultModule,

    #[error("Driver source location not configured (set --driver-src or KDUMP_DRIVER_SRC)")]
    DriverSourceNotConfigured,

    #[error("Binary not present for {module}: {path}")]
    BinaryNotFound { module: ModuleName, path: PathBuf },

    #[error("Function {function} not present in driver binary {binary}")]
    SymbolNotFound { function: String, binary: PathBuf },

    #[error("Source file {file} not present under {root}")]
    FileNotFound { file: String, root: PathBuf },

    #[error("Unsupported platform: {0} (a POSIX host is required)")]
    UnsupportedPlatform(&'static str),

    #[error("Debugger timed out after {timeout:?} resolving {function}")]
    SymbolResolutionTimeout { function: String, timeout: Duration },

    #[error("Failed to run debugger {program}: {source}")]
    DebuggerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source search cancelled")]
    Cancelled,

    #[error("Call trace {index} out of range ({count} found)")]
    TraceIndexOutOfRange { index: usize, count: usize },

    #[error("Frame {index} out of range ({count} frames)")]
    FrameIndexOutOfRange { index: usize, count: usize },

    #[error("No crash directory selected")]
    NoDirectorySelected,

    #[error("No call trace selected")]
    NoTraceSelected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TriageError {
    /// Short machine-readable name of the failure, used in JSON output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCrashDirectories(_) => "NoCrashDirectories",
            Self::LogUnreadable { .. } => "LogUnreadable",
            Self::NoCallTraceFound => "NoCallTraceFound",
            Self::UnknownFaultModule => "UnknownFaultModule",
            Self::DriverSourceNotConfigured => "DriverSourceNotConfigured",
            Self::BinaryNotFound { .. } => "BinaryNotFound",
            Self::SymbolNotFound { .. } => "SymbolNotFound",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::UnsupportedPlatform(_) => "UnsupportedPlatform",
            Self::SymbolResolutionTimeout { .. } => "SymbolResolutionTimeout",
            Self::DebuggerUnavailable { .. } => "DebuggerUnavailable",
            Self::Cancelled => "Cancelled",
            Self::TraceIndexOutOfRange { .. } => "TraceIndexOutOfRange",
            Self::FrameIndexOutOfRange { .. } => "FrameIndexOutOfRange",
            Self::NoDirectorySelected => "NoDirectorySelected",
            Self::NoTraceSelected => "NoTraceSelected",
            Self::Io(_) => "Io",
        }
    }
}
