//! Kernel Manifest Parser
//!
//! A kernel directory may carry a `kernels.yaml` manifest naming the source file and
//! entry point of each kernel role. Roles left out of the manifest, or a directory
//! without a manifest, fall back to the conventional `easu.wgsl`, `rcas.wgsl` and
//! `bilinear.wgsl` files with a `main` entry point.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the manifest inside a kernel directory
pub const MANIFEST_FILE_NAME: &str = "kernels.yaml";

/// Entry point used when the manifest does not name one
pub const DEFAULT_ENTRY_POINT: &str = "main";

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

/// Source location of one kernel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KernelEntry {
    /// Source file path relative to the kernel directory
    pub file: String,
    /// Compute entry point inside the source file
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

impl KernelEntry {
    fn named(file: &str) -> Self {
        Self {
            file: file.to_string(),
            entry_point: default_entry_point(),
        }
    }

    fn easu() -> Self {
        Self::named("easu.wgsl")
    }

    fn rcas() -> Self {
        Self::named("rcas.wgsl")
    }

    fn bilinear() -> Self {
        Self::named("bilinear.wgsl")
    }
}

/// Kernel sources for the three upscaler kernels
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KernelManifest {
    /// Edge-adaptive upsample pass
    #[serde(default = "KernelEntry::easu")]
    pub easu: KernelEntry,
    /// Contrast-adaptive sharpen pass
    #[serde(default = "KernelEntry::rcas")]
    pub rcas: KernelEntry,
    /// Bilinear upsample pass
    #[serde(default = "KernelEntry::bilinear")]
    pub bilinear: KernelEntry,
}

impl Default for KernelManifest {
    fn default() -> Self {
        Self {
            easu: KernelEntry::easu(),
            rcas: KernelEntry::rcas(),
            bilinear: KernelEntry::bilinear(),
        }
    }
}

impl KernelManifest {
    /// Parses a kernel manifest from YAML content
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Loads the manifest of a kernel directory
    ///
    /// Returns the default manifest if the directory has no `kernels.yaml`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = dir.as_ref().join(MANIFEST_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content).map_err(|e| format!("invalid kernel manifest {}: {e}", path.display()).into())
    }
}
