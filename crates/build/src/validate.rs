//! WGSL kernel validation
//!
//! Parses and validates a compute kernel with `naga`, rendering any failure as the
//! same human-readable diagnostic a shader compiler would print.

use std::fmt;

/// A kernel that passed parsing and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedKernel {
    /// Name of the compute entry point that was checked
    pub entry_point: String,
    /// Workgroup size declared by the entry point
    pub workgroup_size: [u32; 3],
}

/// Rendered diagnostic text for a kernel that failed to parse or validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDiagnostic {
    /// Human-readable diagnostic, including source snippets where available
    pub message: String,
}

impl fmt::Display for KernelDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for KernelDiagnostic {}

pub(crate) fn validate_module(module: &naga::Module) -> Result<naga::valid::ModuleInfo, naga::WithSpan<naga::valid::ValidationError>> {
    let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    validator.validate(module)
}

/// Parses and validates a WGSL compute kernel
///
/// # Arguments
/// * `source` - WGSL source code
/// * `entry_point` - Name of the compute entry point that must exist in the module
///
/// # Returns
/// The entry point's declared workgroup size, or the rendered diagnostic on failure
pub fn validate_wgsl(source: &str, entry_point: &str) -> Result<ValidatedKernel, KernelDiagnostic> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| KernelDiagnostic { message: e.emit_to_string(source) })?;
    validate_module(&module).map_err(|e| KernelDiagnostic { message: e.emit_to_string(source) })?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| {
            let available = module.entry_points.iter().map(|ep| ep.name.as_str()).collect::<Vec<_>>().join(", ");
            KernelDiagnostic {
                message: format!("no compute entry point named `{entry_point}` (found: [{available}])"),
            }
        })?;

    Ok(ValidatedKernel {
        entry_point: entry.name.clone(),
        workgroup_size: entry.workgroup_size,
    })
}
