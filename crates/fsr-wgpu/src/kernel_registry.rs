//! Compute kernel loading and compilation
//!
//! The three upscaler kernels are compiled exactly once, either from the sources
//! embedded at build time or from a directory of WGSL files. Every source is
//! validated with naga first, so a broken kernel fails with the compiler's own
//! diagnostic before the device ever sees it.

use crate::{ComputeBackend, FsrError, KernelRole, Result, TILE_SIZE};
use fsr_wgpu_build::manifest::{KernelEntry, KernelManifest, MANIFEST_FILE_NAME};
use fsr_wgpu_build::validate_wgsl;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/kernels.rs"));
}

/// Where kernel sources come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KernelSource {
    /// Kernels bundled with the crate
    #[default]
    Embedded,
    /// WGSL files under a directory, optionally described by a `kernels.yaml` manifest
    Directory(PathBuf),
}

/// Bundled WGSL source of a kernel role
pub fn embedded_source(role: KernelRole) -> &'static str {
    match role {
        KernelRole::EdgeAdaptiveUpsample => embedded::EASU,
        KernelRole::Sharpen => embedded::RCAS,
        KernelRole::BilinearUpsample => embedded::BILINEAR,
    }
}

/// Kernel source code resolved from a [`KernelSource`]
struct ResolvedKernel {
    code: String,
    entry_point: String,
}

impl ResolvedKernel {
    fn embedded(role: KernelRole) -> Self {
        Self {
            code: embedded_source(role).to_string(),
            entry_point: fsr_wgpu_build::manifest::DEFAULT_ENTRY_POINT.to_string(),
        }
    }

    fn from_dir(dir: &Path, entry: &KernelEntry) -> Result<Self> {
        let path = dir.join(&entry.file);
        let code = std::fs::read_to_string(&path).map_err(|source| FsrError::KernelSourceUnavailable { path, source })?;
        Ok(Self {
            code,
            entry_point: entry.entry_point.clone(),
        })
    }
}

/// Compiled kernels for every role
///
/// Kernel handles are immutable after loading and live as long as the registry.
pub struct KernelRegistry<B: ComputeBackend> {
    easu: B::Kernel,
    rcas: B::Kernel,
    bilinear: B::Kernel,
}

impl<B: ComputeBackend> KernelRegistry<B> {
    /// Loads and compiles all three kernels
    ///
    /// # Arguments
    /// * `backend` - Device that compiles the kernels
    /// * `source` - Where the WGSL sources are read from
    ///
    /// # Errors
    /// `KernelSourceUnavailable` if a file or the manifest cannot be read, and
    /// `KernelCompile` naming the failing kernel if parsing, validation, or pipeline
    /// creation fails. No kernel is retried.
    pub fn load_all(backend: &mut B, source: &KernelSource) -> Result<Self> {
        let [easu, rcas, bilinear] = match source {
            KernelSource::Embedded => KernelRole::ALL.map(ResolvedKernel::embedded),
            KernelSource::Directory(dir) => {
                let manifest = KernelManifest::from_dir(dir).map_err(|e| FsrError::KernelSourceUnavailable {
                    path: dir.join(MANIFEST_FILE_NAME),
                    source: std::io::Error::other(e.to_string()),
                })?;
                [
                    ResolvedKernel::from_dir(dir, &manifest.easu)?,
                    ResolvedKernel::from_dir(dir, &manifest.rcas)?,
                    ResolvedKernel::from_dir(dir, &manifest.bilinear)?,
                ]
            }
        };

        let registry = Self {
            easu: compile(backend, KernelRole::EdgeAdaptiveUpsample, &easu)?,
            rcas: compile(backend, KernelRole::Sharpen, &rcas)?,
            bilinear: compile(backend, KernelRole::BilinearUpsample, &bilinear)?,
        };
        info!(?source, "compiled upscaler kernels");
        Ok(registry)
    }

    /// Returns the compiled kernel for a role
    pub fn get(&self, role: KernelRole) -> &B::Kernel {
        match role {
            KernelRole::EdgeAdaptiveUpsample => &self.easu,
            KernelRole::Sharpen => &self.rcas,
            KernelRole::BilinearUpsample => &self.bilinear,
        }
    }
}

fn compile<B: ComputeBackend>(backend: &mut B, role: KernelRole, kernel: &ResolvedKernel) -> Result<B::Kernel> {
    let compile_error = |diagnostic: String| FsrError::KernelCompile {
        kernel_name: role.name().to_string(),
        diagnostic,
    };

    let validated = validate_wgsl(&kernel.code, &kernel.entry_point).map_err(|d| compile_error(d.message))?;
    if validated.workgroup_size != [TILE_SIZE, TILE_SIZE, 1] {
        let [x, y, z] = validated.workgroup_size;
        return Err(compile_error(format!(
            "entry point `{}` declares @workgroup_size({x}, {y}, {z}), expected ({TILE_SIZE}, {TILE_SIZE}, 1)",
            kernel.entry_point
        )));
    }

    debug!(kernel = role.name(), entry_point = %kernel.entry_point, bytes = kernel.code.len(), "compiling kernel");
    backend.compile_kernel(role, &kernel.code, &kernel.entry_point)
}
