//! FSR-wgpu kernel tooling
//!
//! This crate holds the shader-side helpers shared by the `fsr-wgpu` build script
//! and its runtime kernel registry: WGSL validation with rendered diagnostics,
//! WGSL minification for embedding, and the optional kernel manifest that maps
//! each kernel role to a source file and entry point.

mod minify;
mod validate;

pub mod manifest;

pub use minify::minify_wgsl;
pub use validate::{KernelDiagnostic, ValidatedKernel, validate_wgsl};
