//! Newtype wrappers for the values passed between pipeline stages

use serde::Serialize;
use std::fmt;

/// Kernel module name as reported in a frame annotation (e.g. `nvme_core`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleName(pub String);

impl ModuleName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbol reference handed to the debugger: `function` or `function+0xoffset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FunctionRef(pub String);

impl FunctionRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Function name without the `+offset` part
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split('+').next().unwrap_or(&self.0)
    }
}

impl From<&str> for FunctionRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 0-based line index used for navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LineIndex(pub usize);

impl LineIndex {
    /// Convert a 1-based line number as printed by tools into an index.
    /// Line 0 does not exist in 1-based numbering and maps to index 0.
    #[must_use]
    pub fn from_one_based(line: u32) -> Self {
        Self((line as usize).saturating_sub(1))
    }

    /// 1-based line number for display (`file:line`)
    #[must_use]
    pub fn one_based(self) -> usize {
        self.0 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_ref_name() {
        assert_eq!(FunctionRef::from("nvme_irq+0x20").name(), "nvme_irq");
        assert_eq!(FunctionRef::from("nvme_irq").name(), "nvme_irq");
    }

    #[test]
    fn test_line_index_conversion() {
        let idx = LineIndex::from_one_based(412);
        assert_eq!(idx, LineIndex(411));
        assert_eq!(idx.one_based(), 412);
        assert_eq!(LineIndex::from_one_based(0), LineIndex(0));
    }
}
