//! # Kernel Log Parsing
//!
//! Turns the unstructured text of a captured kernel log (`vmcore-dmesg.txt`)
//! into the pieces needed for triage:
//!
//! - **`blocks`**: call-trace blocks, split at each `Call Trace:` marker, and
//!   the frames inside a block
//! - **`frame`**: tokenizer for `function+offset/size [module]` frame lines
//! - **`fault`**: the first module-tagged line at or after the register dump
//!   (`RIP:`), i.e. the driver code that was executing at fault time
//!
//! Everything here is pure string processing over a borrowed `&str`; nothing
//! touches the filesystem.

pub mod blocks;
pub mod fault;
pub mod frame;

pub use blocks::{
    call_trace_blocks, line_of_last_occurrence, CallTraceBlock, CallTraceBlocks, CALL_TRACE_MARKER,
};
pub use fault::{locate_fault_site, FaultSite, REGISTER_DUMP_MARKER};
pub use frame::{FrameSymbol, StackFrame};
