//! Fault site detection
//!
//! The register dump is printed once per fault and names the faulting
//! instruction pointer. Starting at its first occurrence, the first
//! module-tagged line identifies the driver that was executing. Core kernel
//! frames carry no module annotation and are skipped.

use log::{debug, info};
use serde::Serialize;

use super::frame::{module_annotation, symbol_token};
use crate::domain::{FunctionRef, ModuleName, TriageError};

/// Marker of the instruction pointer line in an x86-64 register dump
pub const REGISTER_DUMP_MARKER: &str = "RIP:";

/// First driver-attributable line of a crash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultSite {
    pub module: ModuleName,
    pub function_ref: FunctionRef,
    /// The log line the site was taken from
    pub line: String,
    /// 0-based line number of that line in the log
    pub line_number: usize,
}

/// Locate the fault site in a crash log.
///
/// # Errors
/// Returns `UnknownFaultModule` if the register marker is absent or no
/// module-tagged line follows it.
pub fn locate_fault_site(text: &str, register_marker: &str) -> Result<FaultSite, TriageError> {
    if register_marker.is_empty() {
        return Err(TriageError::UnknownFaultModule);
    }
    let marker_pos = text.find(register_marker).ok_or(TriageError::UnknownFaultModule)?;
    let line_start = text[..marker_pos].rfind('\n').map_or(0, |pos| pos + 1);
    let first_line = text[..line_start].bytes().filter(|&b| b == b'\n').count();

    for (i, line) in text[line_start..].lines().enumerate() {
        let Some((before, module)) = module_annotation(line) else {
            continue;
        };

        let Some(function) = symbol_token(before).and_then(|t| t.split('/').next()) else {
            debug!("Line {} tagged [{module}] has no symbol, skipping", first_line + i);
            continue;
        };

        let site = FaultSite {
            module: ModuleName::from(module),
            function_ref: FunctionRef::from(function),
            line: line.trim_end().to_string(),
            line_number: first_line + i,
        };
        info!(
            "Fault site: {} in [{}] (log line {})",
            site.function_ref, site.module, site.line_number
        );
        return Ok(site);
    }

    Err(TriageError::UnknownFaultModule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_on_rip_line() {
        let log = "\
[   11.0] BUG: kernel NULL pointer dereference, address: 0000000000000008
[   11.1] RIP: 0010:nvme_irq_handler+0x20/0x40 [nvme]
[   11.2] RSP: 0018:ffffc90000003e60 EFLAGS: 00010046
";
        let site = locate_fault_site(log, REGISTER_DUMP_MARKER).unwrap();
        assert_eq!(site.module, ModuleName::from("nvme"));
        assert_eq!(site.function_ref, FunctionRef::from("nvme_irq_handler+0x20"));
        assert_eq!(site.line_number, 1);
    }

    #[test]
    fn test_skips_untagged_frames() {
        let log = "\
[   11.1] RIP: 0010:memcpy_orig+0x10/0x120
[   11.2] RSP: 0018:ffffc90000003e60 EFLAGS: 00010046
[   11.3] Call Trace:
[   11.4]  <TASK>
[   11.5]  __memcpy+0x5/0x10
[   11.6]  driverX_xmit+0x8c/0x300 [driverX]
[   11.7]  other_rx+0x1/0x2 [c]
";
        let site = locate_fault_site(log, REGISTER_DUMP_MARKER).unwrap();
        assert_eq!(site.module, ModuleName::from("driverX"));
        assert_eq!(site.function_ref.as_str(), "driverX_xmit+0x8c");
        assert_eq!(site.line_number, 5);
    }

    #[test]
    fn test_frames_before_register_dump_are_ignored() {
        let log = "\
[    5.0]  early_probe+0x1/0x2 [early]
[   11.1] RIP: 0010:ixgbe_poll+0x10a/0x1c0 [ixgbe]
";
        let site = locate_fault_site(log, REGISTER_DUMP_MARKER).unwrap();
        assert_eq!(site.module.as_str(), "ixgbe");
    }

    #[test]
    fn test_no_driver_frame() {
        let log = "\
[   11.1] RIP: 0010:memcpy_orig+0x10/0x120
[   11.2] Modules linked in: nvme nvme_core [last unloaded: e1000]
";
        assert!(matches!(
            locate_fault_site(log, REGISTER_DUMP_MARKER),
            Err(TriageError::UnknownFaultModule)
        ));
    }

    #[test]
    fn test_no_register_dump() {
        assert!(matches!(
            locate_fault_site("Call Trace:\n foo+0x1/0x2 [bar]\n", REGISTER_DUMP_MARKER),
            Err(TriageError::UnknownFaultModule)
        ));
    }
}
