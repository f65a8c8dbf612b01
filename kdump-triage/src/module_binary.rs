//! Module name to compiled `.ko` path under the driver source root.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::{ModuleName, TriageError};

/// Driver source root, always ending with a path separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSourceRoot(String);

impl DriverSourceRoot {
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self(root)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for DriverSourceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a module's source and binary live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleBinary {
    pub module: ModuleName,
    pub source_dir: PathBuf,
    pub binary_path: PathBuf,
}

/// Compute the source directory and binary path of `module`.
///
/// `nvme_core` is the one exception: its sources share the `nvme` directory
/// with the nvme driver and its binary is `nvme-core.ko`.
#[must_use]
pub fn module_binary_layout(root: &DriverSourceRoot, module: &ModuleName) -> ModuleBinary {
    let (directory, file_stem) = match module.as_str() {
        "nvme_core" => ("nvme", "nvme-core"),
        name => (name, name),
    };

    let source_dir = PathBuf::from(format!("{root}{directory}"));
    let binary_path = source_dir.join(format!("{file_stem}.ko"));
    ModuleBinary { module: module.clone(), source_dir, binary_path }
}

/// Resolve the binary of `module`, checking that it exists.
///
/// # Errors
/// Returns `BinaryNotFound` if no file exists at the expected path.
pub fn resolve_module_binary(
    root: &DriverSourceRoot,
    module: &ModuleName,
) -> Result<ModuleBinary, TriageError> {
    let layout = module_binary_layout(root, module);
    if !layout.binary_path.is_file() {
        warn!("Binary not present for {module} at {}", layout.binary_path.display());
        return Err(TriageError::BinaryNotFound {
            module: module.clone(),
            path: layout.binary_path,
        });
    }

    debug!("Module {module} -> {}", layout.binary_path.display());
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_normalized() {
        assert_eq!(DriverSourceRoot::new("/src/drivers").as_str(), "/src/drivers/");
        assert_eq!(DriverSourceRoot::new("/src/drivers/").as_str(), "/src/drivers/");
    }

    #[test]
    fn test_nvme_core_exception() {
        let root = DriverSourceRoot::new("/src");
        let layout = module_binary_layout(&root, &ModuleName::from("nvme_core"));
        assert_eq!(layout.source_dir, PathBuf::from("/src/nvme"));
        assert_eq!(layout.binary_path, PathBuf::from("/src/nvme/nvme-core.ko"));
    }

    #[test]
    fn test_regular_module() {
        let root = DriverSourceRoot::new("/src/");
        let layout = module_binary_layout(&root, &ModuleName::from("ixgbe"));
        assert_eq!(layout.binary_path, PathBuf::from("/src/ixgbe/ixgbe.ko"));

        let layout = module_binary_layout(&root, &ModuleName::from("nvme"));
        assert_eq!(layout.binary_path, PathBuf::from("/src/nvme/nvme.ko"));
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let root = DriverSourceRoot::new(dir.path().to_string_lossy());
        let err = resolve_module_binary(&root, &ModuleName::from("ixgbe")).unwrap_err();
        assert!(matches!(err, TriageError::BinaryNotFound { .. }));
    }

    #[test]
    fn test_existing_binary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nvme")).unwrap();
        std::fs::write(dir.path().join("nvme").join("nvme-core.ko"), b"\x7fELF").unwrap();

        let root = DriverSourceRoot::new(dir.path().to_string_lossy());
        let binary = resolve_module_binary(&root, &ModuleName::from("nvme_core")).unwrap();
        assert!(binary.binary_path.ends_with("nvme/nvme-core.ko"));
    }
}
