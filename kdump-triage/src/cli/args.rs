//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::TriageConfig;
use crate::crash_dump::DEFAULT_CRASH_ROOT;
use crate::module_binary::DriverSourceRoot;
use crate::symbolization::{GdbSymbolizer, DEFAULT_DEBUGGER};

#[derive(Parser)]
#[command(
    name = "kdump-triage",
    version,
    about = "Locate the driver source line behind a kernel crash",
    after_help = "\
EXAMPLES:
    kdump-triage list                                        List crash dumps
    kdump-triage traces 2024-01-01                           Call traces in a crash log
    kdump-triage --driver-src ~/drivers trace 2024-01-01     Frames and faulting source line
    kdump-triage --driver-src ~/drivers frame 2024-01-01 4   Resolve frame 4 of the first trace"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding one subdirectory per crash
    #[arg(long, global = true, env = "KDUMP_CRASH_ROOT", default_value = DEFAULT_CRASH_ROOT)]
    pub crash_root: PathBuf,

    /// Root of the driver sources; each module has a subdirectory with its .ko
    #[arg(long, global = true, env = "KDUMP_DRIVER_SRC", value_name = "DIR")]
    pub driver_src: Option<String>,

    /// Debugger used for symbol resolution
    #[arg(long, global = true, env = "KDUMP_DEBUGGER", default_value = DEFAULT_DEBUGGER)]
    pub debugger: String,

    /// Extra argument passed to the debugger (repeatable)
    #[arg(long = "debugger-arg", global = true, value_name = "ARG", allow_hyphen_values = true)]
    pub debugger_args: Vec<String>,

    /// Debugger timeout in seconds (0 = wait forever)
    #[arg(long, global = true, env = "KDUMP_DEBUGGER_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List crash directories under the crash root
    List,

    /// List the call traces found in a crash log
    Traces {
        /// Crash directory name
        dir: String,
    },

    /// Print the log position of the last call trace
    Locate {
        dir: String,

        /// Only consider traces starting at or before this byte offset
        #[arg(long)]
        cursor: Option<usize>,
    },

    /// Show the frames of a call trace and resolve the crash's fault site
    Trace {
        dir: String,

        /// Call trace index (0 = first in the log)
        #[arg(long, default_value = "0")]
        index: usize,
    },

    /// Resolve one frame of a call trace to its source line
    Frame {
        dir: String,

        /// Frame index within the call trace
        frame: usize,

        /// Call trace index (0 = first in the log)
        #[arg(long, default_value = "0")]
        trace: usize,
    },

    /// Resolve a function reference inside a module binary
    Symbol {
        /// Module name as printed in the log (e.g. nvme_core)
        module: String,

        /// Function with optional offset (e.g. nvme_irq_handler+0x20)
        function: String,
    },
}

impl Args {
    #[must_use]
    pub fn triage_config(&self) -> TriageConfig {
        TriageConfig {
            crash_root: self.crash_root.clone(),
            driver_root: self.driver_src.as_deref().map(DriverSourceRoot::new),
            ..TriageConfig::default()
        }
    }

    #[must_use]
    pub fn symbolizer(&self) -> GdbSymbolizer {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        GdbSymbolizer::new(&self.debugger)
            .with_leading_args(self.debugger_args.clone())
            .with_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kdump-triage", "list"]).unwrap();
        assert!(matches!(args.command, Command::List));
        assert!(!args.json);
        assert_eq!(args.debugger, "gdb");
    }

    #[test]
    fn test_frame_command() {
        let args = Args::try_parse_from([
            "kdump-triage",
            "--driver-src",
            "/src/drivers",
            "frame",
            "2024-01-01",
            "4",
            "--trace",
            "1",
        ])
        .unwrap();
        let Command::Frame { dir, frame, trace } = &args.command else {
            panic!("expected frame command");
        };
        assert_eq!((dir.as_str(), *frame, *trace), ("2024-01-01", 4, 1));

        let config = args.triage_config();
        assert_eq!(config.driver_root.unwrap().as_str(), "/src/drivers/");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["kdump-triage", "traces", "d", "--json", "--timeout", "0"])
                .unwrap();
        assert!(args.json);
        assert_eq!(args.timeout, 0);
    }
}
