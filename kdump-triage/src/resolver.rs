//! # Crash Trace Resolution
//!
//! Drives the pipeline for one crash directory at a time:
//!
//! ```text
//! Idle ──select_directory──▶ DirectorySelected ──select_trace──▶ TraceSelected
//!                                                                     │
//!                                                               select_frame
//!                                                                     ▼
//!                                                               FrameSelected
//! ```
//!
//! Every selection is recomputed from the crash log; nothing derived is
//! cached. A transition that fails leaves the previous state in place, so an
//! error in one request never invalidates a selection that already completed.
//!
//! Resolving a driver function goes through four stages:
//! module name → `.ko` path → debugger `file:line` → file on disk.

use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::TriageConfig;
use crate::crash_dump::CrashLog;
use crate::domain::{FunctionRef, LineIndex, ModuleName, TriageError};
use crate::kernel_log::{locate_fault_site, CallTraceBlocks, FaultSite, StackFrame};
use crate::module_binary::resolve_module_binary;
use crate::preflight::check_debug_info;
use crate::source_locator::{find_source_file, CancelToken};
use crate::symbolization::SymbolResolver;

/// Navigation target produced by a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 0-based line index
    pub line: LineIndex,
    pub module: ModuleName,
    pub function: FunctionRef,
}

/// Fault site of the crash and where it resolved to
#[derive(Debug)]
pub struct FaultResolution {
    pub site: FaultSite,
    pub location: Result<SourceLocation, TriageError>,
}

/// A selected call-trace block
#[derive(Debug)]
pub struct TraceSelection {
    pub index: usize,
    /// 0-based log line of the marker
    pub line_number: usize,
    pub header: String,
    pub frames: Vec<StackFrame>,
    /// `Err(UnknownFaultModule)` when the crash is not attributable to a driver
    pub fault: Result<FaultResolution, TriageError>,
}

/// A selected frame; `location` is `None` for frames without a module tag
#[derive(Debug)]
pub struct FrameSelection {
    pub index: usize,
    pub frame: StackFrame,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    DirectorySelected {
        log: CrashLog,
    },
    TraceSelected {
        log: CrashLog,
        trace: TraceSelection,
    },
    FrameSelected {
        log: CrashLog,
        trace: TraceSelection,
        frame: FrameSelection,
    },
}

impl SessionState {
    fn log(&self) -> Option<&CrashLog> {
        match self {
            Self::Idle => None,
            Self::DirectorySelected { log }
            | Self::TraceSelected { log, .. }
            | Self::FrameSelected { log, .. } => Some(log),
        }
    }

    fn into_log(self) -> Option<CrashLog> {
        match self {
            Self::Idle => None,
            Self::DirectorySelected { log }
            | Self::TraceSelected { log, .. }
            | Self::FrameSelected { log, .. } => Some(log),
        }
    }
}

/// Orchestrates crash-trace resolution over one active selection
pub struct CrashTraceResolver<R> {
    config: TriageConfig,
    resolver: R,
    cancel: CancelToken,
    state: SessionState,
}

impl<R: SymbolResolver> CrashTraceResolver<R> {
    pub fn new(config: TriageConfig, resolver: R) -> Self {
        Self { config, resolver, cancel: CancelToken::new(), state: SessionState::Idle }
    }

    #[must_use]
    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Share `token` with a caller that may abort requests from elsewhere
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts the source search of the running request
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn crash_log(&self) -> Option<&CrashLog> {
        self.state.log()
    }

    #[must_use]
    pub fn trace(&self) -> Option<&TraceSelection> {
        match &self.state {
            SessionState::TraceSelected { trace, .. }
            | SessionState::FrameSelected { trace, .. } => Some(trace),
            _ => None,
        }
    }

    #[must_use]
    pub fn frame(&self) -> Option<&FrameSelection> {
        match &self.state {
            SessionState::FrameSelected { frame, .. } => Some(frame),
            _ => None,
        }
    }

    /// Load the crash log of directory `name`. Any previous selection is dropped.
    ///
    /// # Errors
    /// `LogUnreadable` if the log cannot be read; the previous state is kept.
    pub fn select_directory(&mut self, name: &str) -> Result<&CrashLog, TriageError> {
        let log = CrashLog::load(&self.config.crash_root, name)?;
        let count = log.call_trace_blocks(&self.config.call_trace_marker).count();
        if count == 0 {
            warn!("No call trace in {}", log.path().display());
        } else {
            info!("{count} call traces in {}", log.path().display());
        }

        self.state = SessionState::DirectorySelected { log };
        self.crash_log().ok_or(TriageError::NoDirectorySelected)
    }

    /// Call-trace blocks of the selected log, in file order
    ///
    /// # Errors
    /// `NoDirectorySelected` before a directory is selected.
    pub fn call_traces(&self) -> Result<CallTraceBlocks<'_>, TriageError> {
        let log = self.crash_log().ok_or(TriageError::NoDirectorySelected)?;
        Ok(log.call_trace_blocks(&self.config.call_trace_marker))
    }

    /// Select call-trace block `index` and resolve the crash's fault site.
    ///
    /// A fault that cannot be attributed or resolved is reported inside the
    /// selection; the frames are still available.
    ///
    /// # Errors
    /// `NoDirectorySelected`, `NoCallTraceFound` or `TraceIndexOutOfRange`;
    /// the previous state is kept.
    pub fn select_trace(&mut self, index: usize) -> Result<&TraceSelection, TriageError> {
        let trace = {
            let log = self.crash_log().ok_or(TriageError::NoDirectorySelected)?;
            let blocks = log.call_trace_blocks(&self.config.call_trace_marker);
            let count = blocks.clone().count();
            if count == 0 {
                return Err(TriageError::NoCallTraceFound);
            }
            let block = blocks
                .clone()
                .nth(index)
                .ok_or(TriageError::TraceIndexOutOfRange { index, count })?;

            let fault = locate_fault_site(log.text(), &self.config.register_marker).map(|site| {
                let location = self.resolve_symbol(&site.module, &site.function_ref);
                FaultResolution { site, location }
            });
            if let Err(e) = &fault {
                warn!("{e}");
            }

            TraceSelection {
                index,
                line_number: block.line_number,
                header: block.header.to_string(),
                frames: block.frames().collect(),
                fault,
            }
        };

        let log = std::mem::take(&mut self.state)
            .into_log()
            .ok_or(TriageError::NoDirectorySelected)?;
        self.state = SessionState::TraceSelected { log, trace };
        self.trace().ok_or(TriageError::NoTraceSelected)
    }

    /// Select frame `index` of the current trace and resolve it if it is
    /// module-tagged. Untagged frames are leaves with no location.
    ///
    /// # Errors
    /// `NoTraceSelected`, `FrameIndexOutOfRange` or any resolution failure;
    /// the trace selection is kept.
    pub fn select_frame(&mut self, index: usize) -> Result<&FrameSelection, TriageError> {
        let trace = self.trace().ok_or(TriageError::NoTraceSelected)?;
        let count = trace.frames.len();
        let frame = trace
            .frames
            .get(index)
            .cloned()
            .ok_or(TriageError::FrameIndexOutOfRange { index, count })?;

        let location = match &frame.symbol {
            Some(symbol) => Some(self.resolve_symbol(&symbol.module, &symbol.function_ref())?),
            None => {
                info!("Frame {index} has no module annotation, nothing to resolve");
                None
            }
        };

        match std::mem::take(&mut self.state) {
            SessionState::TraceSelected { log, trace }
            | SessionState::FrameSelected { log, trace, .. } => {
                self.state = SessionState::FrameSelected {
                    log,
                    trace,
                    frame: FrameSelection { index, frame, location },
                };
            }
            other => {
                self.state = other;
                return Err(TriageError::NoTraceSelected);
            }
        }
        self.frame().ok_or(TriageError::NoTraceSelected)
    }

    /// Resolve `function` in `module` to a file on disk.
    ///
    /// # Errors
    /// `DriverSourceNotConfigured`, `BinaryNotFound`, `SymbolNotFound`,
    /// `FileNotFound` or a debugger failure.
    pub fn resolve_symbol(
        &self,
        module: &ModuleName,
        function: &FunctionRef,
    ) -> Result<SourceLocation, TriageError> {
        self.cancel.reset();
        let root = self
            .config
            .driver_root
            .as_ref()
            .ok_or(TriageError::DriverSourceNotConfigured)?;
        let binary = resolve_module_binary(root, module)?;
        check_debug_info(&binary.binary_path);

        let symbol = self.resolver.resolve(&binary.binary_path, function)?;

        let file = find_source_file(&binary.source_dir, symbol.file_name(), &self.cancel)?;

        let location = SourceLocation {
            file,
            line: LineIndex::from_one_based(symbol.line),
            module: module.clone(),
            function: function.clone(),
        };
        info!("{function} [{module}] -> {}:{}", location.file.display(), location.line.one_based());
        Ok(location)
    }
}
