//! # Symbol Resolution for Kernel Modules
//!
//! Maps a `function[+offset]` reference inside a compiled kernel module
//! (`.ko`) to the source file and line it was compiled from.
//!
//! ## Approach
//!
//! Debug information is not decoded here. The module binary is handed to an
//! external debugger, which already understands DWARF, relocations and
//! inlining:
//!
//! ```text
//! gdb --batch -ex "list *(nvme_irq_handler+0x20)" nvme.ko
//!
//! 0x1d0 is in nvme_irq_handler (drivers/nvme/host/pci.c:1089).
//! 1084    ...
//! ```
//!
//! Only the `is in <function> (<path>:<line>)` header is parsed. The path is
//! relative to the tree the module was built in, so only its base name is
//! used afterwards (see `source_locator`).
//!
//! ## Module Structure
//!
//! - **`symbolizer`**: the `SymbolResolver` trait and `GdbSymbolizer`, which
//!   runs the debugger as a subprocess with an optional timeout
//! - **`listing`**: parser for the debugger output
//!
//! The trait is the seam for tests: the pipeline can run against a fake
//! resolver without a debugger installed.
//!
//! ## Failure Modes
//!
//! - Symbol missing from the binary (stale sources vs. binary): `SymbolNotFound`
//! - Debugger not installed: `DebuggerUnavailable`
//! - Debugger hangs: `SymbolResolutionTimeout`, the process is killed

pub mod listing;
pub mod symbolizer;

pub use listing::{parse_listing, SymbolLocation};
pub use symbolizer::{GdbSymbolizer, SymbolResolver, DEFAULT_DEBUGGER, DEFAULT_TIMEOUT};
