//! # kdump-triage - Kernel Crash to Driver Source Line
//!
//! Post-mortem triage for kernel crashes captured by kdump. Given a crash
//! directory, kdump-triage finds the call traces in the captured kernel log,
//! identifies the driver module that was executing when the kernel faulted,
//! and resolves the faulting function to a source file and line using the
//! driver's `.ko` and its local source tree.
//!
//! ## Pipeline
//!
//! ```text
//! /var/crash/<dir>/vmcore-dmesg.txt
//!          │
//!          ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ Call-trace blocks│   │   Fault locator  │  first [module] line after RIP:
//! │  (kernel_log)    │   │   (kernel_log)   │
//! └────────┬─────────┘   └────────┬─────────┘
//!          │ frame                │ fault site
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │  Module binary path  │  <driver-src>/<module>/<module>.ko
//!          │   (module_binary)    │
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │  gdb "list *(sym)"   │  "... is in f (drivers/x/y.c:412)"
//!          │   (symbolization)    │
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │ Find y.c on disk     │
//!          │  (source_locator)    │
//!          └──────────┬───────────┘
//!                     ▼
//!              (file, line index)
//! ```
//!
//! ## Module Structure
//!
//! - [`kernel_log`]: call-trace blocks, frame tokenizer, fault site
//! - [`module_binary`]: module name to `.ko` path, including the `nvme_core` exception
//! - [`symbolization`]: debugger invocation and output parsing
//! - [`source_locator`]: cancellable search for a file by base name
//! - [`resolver`]: selection state machine tying the stages together
//! - [`crash_dump`]: crash directories and log loading
//! - [`preflight`]: platform and environment checks
//! - [`report`]: text and JSON output
//! - [`cli`], [`config`]: command-line arguments and the settings they produce
//! - [`domain`]: error taxonomy and newtypes
//!
//! ELF and DWARF are never decoded here; symbol resolution is delegated to gdb.

pub mod cli;
pub mod config;
pub mod crash_dump;
pub mod domain;
pub mod kernel_log;
pub mod module_binary;
pub mod preflight;
pub mod report;
pub mod resolver;
pub mod source_locator;
pub mod symbolization;
