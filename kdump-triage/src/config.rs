//! Settings shared by every stage of a triage session

use std::path::PathBuf;

use crate::crash_dump::DEFAULT_CRASH_ROOT;
use crate::kernel_log::{CALL_TRACE_MARKER, REGISTER_DUMP_MARKER};
use crate::module_binary::DriverSourceRoot;

#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Directory holding one subdirectory per crash
    pub crash_root: PathBuf,
    /// Root of the driver sources and `.ko` files; resolution needs it
    pub driver_root: Option<DriverSourceRoot>,
    pub call_trace_marker: String,
    pub register_marker: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            crash_root: PathBuf::from(DEFAULT_CRASH_ROOT),
            driver_root: None,
            call_trace_marker: CALL_TRACE_MARKER.to_string(),
            register_marker: REGISTER_DUMP_MARKER.to_string(),
        }
    }
}

impl TriageConfig {
    #[must_use]
    pub fn with_driver_root(mut self, root: impl Into<String>) -> Self {
        self.driver_root = Some(DriverSourceRoot::new(root));
        self
    }
}
