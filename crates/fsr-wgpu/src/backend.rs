//! Device abstraction used by the upscale pipeline
//!
//! The pipeline never touches implicit device state. Every call into a
//! [`ComputeBackend`] names the exact image, parameter buffer, and kernel it uses,
//! and a [`KernelInvocation`] carries every binding of a single dispatch.

use crate::{DispatchGrid, Extent, Result};
use std::fmt;

/// Role a compiled kernel plays in the upscale pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelRole {
    /// Edge-adaptive upsample (first pass of the sharpened upscaler)
    EdgeAdaptiveUpsample,
    /// Contrast-adaptive sharpen (second pass, in place on the output image)
    Sharpen,
    /// Bilinear upsample (single-pass smoothed upscaler)
    BilinearUpsample,
}

impl KernelRole {
    /// All kernel roles, in registry order
    pub const ALL: [KernelRole; 3] = [KernelRole::EdgeAdaptiveUpsample, KernelRole::Sharpen, KernelRole::BilinearUpsample];

    /// Short kernel name used in diagnostics and labels
    pub fn name(&self) -> &'static str {
        match self {
            KernelRole::EdgeAdaptiveUpsample => "easu",
            KernelRole::Sharpen => "rcas",
            KernelRole::BilinearUpsample => "bilinear",
        }
    }

    /// Whether the kernel reads and writes the output image in the same dispatch
    pub fn is_in_place(&self) -> bool {
        matches!(self, KernelRole::Sharpen)
    }
}

impl fmt::Display for KernelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Image a kernel reads from
#[derive(Debug)]
pub enum KernelInput<'a, I> {
    /// A separate source image, bound read-only
    Image(&'a I),
    /// The target image itself, bound read-write
    InPlace,
}

/// Every binding of one kernel dispatch
///
/// Binding points follow the kernel interface: 0 is the parameter buffer, 1 the
/// source image (absent for in-place kernels), 2 the target image.
pub struct KernelInvocation<'a, B: ComputeBackend + ?Sized> {
    /// Role of the kernel being dispatched
    pub role: KernelRole,
    /// Compiled kernel
    pub kernel: &'a B::Kernel,
    /// Parameter buffer bound at binding 0
    pub params: &'a B::ParamBuffer,
    /// Source image bound at binding 1
    pub source: KernelInput<'a, B::Image>,
    /// Target image bound at binding 2
    pub target: &'a B::Image,
    /// Workgroup grid to dispatch
    pub grid: DispatchGrid,
}

/// A compute device able to run the upscale pipeline
///
/// Implementations own the device-side allocation of images, parameter buffers, and
/// compiled kernels. All methods are called from a single control thread.
pub trait ComputeBackend {
    /// Handle to a 2D RGBA 32-bit float image
    type Image;
    /// Handle to a uniform parameter buffer
    type ParamBuffer;
    /// Handle to a compiled compute kernel
    type Kernel;

    /// Largest width or height an image may have
    fn max_image_dimension(&self) -> u32;

    /// Compiles a validated WGSL kernel
    ///
    /// # Arguments
    /// * `role` - Role of the kernel, which fixes its binding layout
    /// * `source` - WGSL source code
    /// * `entry_point` - Compute entry point inside `source`
    fn compile_kernel(&mut self, role: KernelRole, source: &str, entry_point: &str) -> Result<Self::Kernel>;

    /// Allocates a read-write image of exactly `extent`
    fn create_image(&mut self, extent: Extent) -> Result<Self::Image>;

    /// Releases an image
    fn destroy_image(&mut self, image: Self::Image);

    /// Allocates a parameter buffer of `size` bytes
    fn create_param_buffer(&mut self, size: u64) -> Result<Self::ParamBuffer>;

    /// Replaces the whole content of a parameter buffer
    fn write_param_buffer(&mut self, buffer: &Self::ParamBuffer, bytes: &[u8]) -> Result<()>;

    /// Releases a parameter buffer
    fn destroy_param_buffer(&mut self, buffer: Self::ParamBuffer);

    /// Issues one kernel dispatch
    fn submit(&mut self, invocation: &KernelInvocation<'_, Self>) -> Result<()>;

    /// Blocks until every previously issued dispatch has completed
    fn fence(&mut self) -> Result<()>;
}
