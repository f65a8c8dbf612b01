//! Stack frame tokenizer
//!
//! Kernel backtrace lines look like
//!
//! ```text
//! [   12.000002]  ? nvme_irq_handler+0x20/0x40 [nvme]
//! [   12.000000] RIP: 0010:nvme_irq_handler+0x20/0x40 [nvme 3f2a9c...]
//! ```
//!
//! Only lines ending in a module annotation are attributable to driver code.
//! Leading timestamps are bracketed too, so the annotation is always taken from
//! the end of the line and validated strictly.

use serde::Serialize;

use crate::domain::{FunctionRef, ModuleName};

/// One line of a call-trace block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub raw: String,
    /// Present when the line matches `function+offset/size [module]`
    pub symbol: Option<FrameSymbol>,
}

/// Fields derived from a module-tagged frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSymbol {
    pub function: String,
    pub offset: String,
    pub size: String,
    pub module: ModuleName,
}

impl FrameSymbol {
    /// `function+offset`, the form handed to the debugger
    #[must_use]
    pub fn function_ref(&self) -> FunctionRef {
        FunctionRef(format!("{}+{}", self.function, self.offset))
    }
}

impl StackFrame {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let raw = line.trim_end().to_string();
        let symbol = module_annotation(line).and_then(|(before, module)| {
            let token = symbol_token(before)?;
            let (function, offset, size) = split_symbol(token)?;
            Some(FrameSymbol {
                function: function.to_string(),
                offset: offset.to_string(),
                size: size.to_string(),
                module: ModuleName::from(module),
            })
        });
        Self { raw, symbol }
    }

    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.symbol.is_some()
    }
}

/// Split a line ending in `[module ...]` into the text before the annotation and
/// the module name.
///
/// The group must be the last thing on the line, contain no `:` and start with
/// a word of `[A-Za-z0-9_-]` that is not purely numeric.
pub(crate) fn module_annotation(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end();
    if !line.ends_with(']') {
        return None;
    }
    let inner_end = line.len() - 1;
    let open = line[..inner_end].rfind('[')?;
    let inner = &line[open + 1..inner_end];

    if inner.contains(':') {
        return None;
    }
    let module = inner.split_whitespace().next()?;
    let valid_chars = module.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let numeric = module.chars().all(|c| c.is_ascii_digit());
    if !valid_chars || numeric {
        return None;
    }

    Some((line[..open].trim_end(), module))
}

/// The symbol token right before the annotation, with a `CS:` style prefix
/// (`0010:` on `RIP:` lines) removed.
pub(crate) fn symbol_token(before: &str) -> Option<&str> {
    let token = before.split_whitespace().last()?;
    let token = token.rsplit(':').next()?;
    (!token.is_empty() && token != "?").then_some(token)
}

/// `function+offset/size` into its three parts
fn split_symbol(token: &str) -> Option<(&str, &str, &str)> {
    let (reference, size) = token.split_once('/')?;
    let (function, offset) = reference.split_once('+')?;
    if function.is_empty() || offset.is_empty() || size.is_empty() {
        return None;
    }
    Some((function, offset, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_frame() {
        let frame = StackFrame::parse("[   12.000002]  nvme_irq_handler+0x20/0x40 [nvme]");
        let symbol = frame.symbol.expect("frame should match");
        assert_eq!(symbol.function, "nvme_irq_handler");
        assert_eq!(symbol.offset, "0x20");
        assert_eq!(symbol.size, "0x40");
        assert_eq!(symbol.module, ModuleName::from("nvme"));
        assert_eq!(symbol.function_ref(), FunctionRef::from("nvme_irq_handler+0x20"));
    }

    #[test]
    fn test_parse_unreliable_frame_with_build_id() {
        let frame = StackFrame::parse(" ? ixgbe_poll+0x10a/0x1c0 [ixgbe 0a1b2c3d4e5f]  ");
        let symbol = frame.symbol.unwrap();
        assert_eq!(symbol.function, "ixgbe_poll");
        assert_eq!(symbol.module.as_str(), "ixgbe");
        assert_eq!(frame.raw, " ? ixgbe_poll+0x10a/0x1c0 [ixgbe 0a1b2c3d4e5f]");
    }

    #[test]
    fn test_core_kernel_frames_do_not_match() {
        let core = StackFrame::parse("[   12.000003]  __handle_irq_event_percpu+0x4a/0x180");
        assert!(!core.is_resolvable());
        assert!(!StackFrame::parse("[   12.000001]  <TASK>").is_resolvable());
        assert!(!StackFrame::parse("").is_resolvable());
    }

    #[test]
    fn test_timestamp_is_not_a_module() {
        assert_eq!(module_annotation("[   12.000003]"), None);
        assert_eq!(module_annotation("[ 42]"), None);
    }

    #[test]
    fn test_modules_list_suffix_is_not_a_module() {
        let line = "Modules linked in: nvme nvme_core [last unloaded: e1000]";
        assert_eq!(module_annotation(line), None);
    }

    #[test]
    fn test_symbol_token_strips_code_segment() {
        let (before, module) =
            module_annotation("[   11.9] RIP: 0010:nvme_irq_handler+0x20/0x40 [nvme]").unwrap();
        assert_eq!(module, "nvme");
        assert_eq!(symbol_token(before), Some("nvme_irq_handler+0x20/0x40"));
    }

    #[test]
    fn test_annotation_without_symbol_does_not_match() {
        assert!(!StackFrame::parse("[   12.0] something odd [nvme]").is_resolvable());
    }
}
