//! Parser for the debugger's `list *(symbol)` output
//!
//! gdb answers with a header line followed by the surrounding source:
//!
//! ```text
//! 0x1d0 is in nvme_irq_handler (drivers/nvme/host/pci.c:1089).
//! 1084    static irqreturn_t nvme_irq_handler(int irq, void *data)
//! ...
//! ```

use serde::Serialize;

const LOCATION_PHRASE: &str = "is in";

/// Source position reported by the debugger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    /// Path as printed by the debugger (usually relative to the build tree)
    pub path: String,
    /// 1-based line number
    pub line: u32,
}

impl SymbolLocation {
    /// Base name of the reported path
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Extract the location from the last `is in` line of `output`.
///
/// Returns `None` when the phrase is missing, the rest of the line has no
/// `file:line` pair, the file name is empty, or the line is not a positive
/// integer.
#[must_use]
pub fn parse_listing(output: &str) -> Option<SymbolLocation> {
    let at = output.rfind(LOCATION_PHRASE)?;
    let rest = output[at + LOCATION_PHRASE.len()..].lines().next()?;

    let (path_part, remainder) = rest.rsplit_once(':')?;
    let path = path_part.rsplit_once('(').map_or(path_part, |(_, p)| p).trim();
    if path.is_empty() || path.ends_with('/') {
        return None;
    }

    let line = remainder.split(')').next()?.trim().parse::<u32>().ok().filter(|&l| l > 0)?;
    Some(SymbolLocation { path: path.to_string(), line })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gdb_header() {
        let output = "\
Reading symbols from e1000.ko...
0x412 is in my_probe (drivers/net/e1000/e1000.c:412).
407\tstatic int my_probe(struct pci_dev *pdev)
";
        let location = parse_listing(output).unwrap();
        assert_eq!(location.path, "drivers/net/e1000/e1000.c");
        assert_eq!(location.file_name(), "e1000.c");
        assert_eq!(location.line, 412);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let output = "\
0x10 is in old_fn (a/old.c:1).
0x20 is in nvme_irq_handler (drivers/nvme/host/pci.c:1089).
";
        let location = parse_listing(output).unwrap();
        assert_eq!(location.file_name(), "pci.c");
        assert_eq!(location.line, 1089);
    }

    #[test]
    fn test_bare_file_name() {
        let location = parse_listing("0x1 is in probe (main.c:7).").unwrap();
        assert_eq!(location.path, "main.c");
        assert_eq!(location.file_name(), "main.c");
    }

    #[test]
    fn test_function_name_with_double_colon() {
        let location = parse_listing("0x1 is in rust_mod::init (rust/mod.rs:42)").unwrap();
        assert_eq!(location.file_name(), "mod.rs");
        assert_eq!(location.line, 42);
    }

    #[test]
    fn test_missing_phrase() {
        assert_eq!(parse_listing("No symbol \"nope\" in current context.\n"), None);
        assert_eq!(parse_listing(""), None);
    }

    #[test]
    fn test_no_colon_after_phrase() {
        assert_eq!(parse_listing("0x1 is in probe (no line info).\n"), None);
    }

    #[test]
    fn test_non_numeric_line() {
        assert_eq!(parse_listing("0x1 is in probe (a.c:abc)."), None);
        assert_eq!(parse_listing("0x1 is in probe (a.c:0)."), None);
    }
}
