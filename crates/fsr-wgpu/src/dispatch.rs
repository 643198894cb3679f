//! Dispatch geometry and pass sequencing
//!
//! Turns a pipeline mode into an ordered series of kernel invocations. Every pass is
//! followed by a full fence, so the sharpen pass only starts once the upsample pass
//! has written the whole output image.

use crate::{ComputeBackend, Extent, KernelInput, KernelInvocation, KernelRegistry, PipelineMode, Result};
use tracing::debug;

/// Side length of the square pixel tile covered by one workgroup
///
/// Must match `@workgroup_size` of every kernel.
pub const TILE_SIZE: u32 = 16;

/// Number of workgroups dispatched along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchGrid {
    /// Workgroups along X
    pub x: u32,
    /// Workgroups along Y
    pub y: u32,
    /// Workgroups along Z, always 1 for image kernels
    pub z: u32,
}

impl DispatchGrid {
    /// Grid covering every pixel of `extent` with `TILE_SIZE` x `TILE_SIZE` tiles
    ///
    /// Edge tiles may extend past the image; kernels bounds-check against the
    /// output extent stored in the constant block.
    pub fn covering(extent: Extent) -> Self {
        Self {
            x: extent.width.div_ceil(TILE_SIZE),
            y: extent.height.div_ceil(TILE_SIZE),
            z: 1,
        }
    }

    /// Total number of workgroups in the grid
    pub fn workgroup_count(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

/// Issues the kernel passes of a pipeline mode
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchEngine;

impl DispatchEngine {
    /// Runs every pass of `mode` and waits for completion
    ///
    /// The grid is derived from the output extent, never the input extent. Both
    /// passes bind the same parameter buffer. The sharpen pass reads and writes
    /// `output` in place and is only issued after a fence on the upsample pass.
    ///
    /// # Arguments
    /// * `backend` - Device to dispatch on
    /// * `mode` - Kernel chain to run
    /// * `kernels` - Compiled kernels
    /// * `params` - Parameter buffer holding the current constant block
    /// * `input` - Source image, never written
    /// * `output` - Target image
    /// * `output_extent` - Extent `output` was created with
    ///
    /// # Errors
    /// Returns `DeviceExecution` if the device fails; later passes are not issued.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch<B: ComputeBackend>(
        &self,
        backend: &mut B,
        mode: PipelineMode,
        kernels: &KernelRegistry<B>,
        params: &B::ParamBuffer,
        input: &B::Image,
        output: &B::Image,
        output_extent: Extent,
    ) -> Result<DispatchGrid> {
        let grid = DispatchGrid::covering(output_extent);
        debug!(mode = mode.name(), %output_extent, grid_x = grid.x, grid_y = grid.y, "dispatching upscale passes");

        for &role in mode.kernels() {
            let source = if role.is_in_place() { KernelInput::InPlace } else { KernelInput::Image(input) };
            let invocation = KernelInvocation {
                role,
                kernel: kernels.get(role),
                params,
                source,
                target: output,
                grid,
            };

            backend.submit(&invocation)?;
            backend.fence()?;
        }

        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, MockEvent};
    use crate::{KernelRole, KernelSource};

    fn grid(width: u32, height: u32) -> (u32, u32, u32) {
        let g = DispatchGrid::covering(Extent::new(width, height));
        (g.x, g.y, g.z)
    }

    #[test]
    fn test_grid_boundaries() {
        for (dimension, tiles) in [(1, 1), (15, 1), (16, 1), (17, 2), (4096, 256)] {
            assert_eq!(grid(dimension, dimension), (tiles, tiles, 1), "square {dimension}");
            assert_eq!(grid(dimension, 16), (tiles, 1, 1), "width {dimension}");
            assert_eq!(grid(16, dimension), (1, tiles, 1), "height {dimension}");
        }
    }

    #[test]
    fn test_grid_covers_every_pixel_once() {
        for (width, height) in [(1, 1), (15, 17), (33, 64), (1023, 1)] {
            let g = DispatchGrid::covering(Extent::new(width, height));
            assert!(g.x * TILE_SIZE >= width && (g.x - 1) * TILE_SIZE < width);
            assert!(g.y * TILE_SIZE >= height && (g.y - 1) * TILE_SIZE < height);
        }
    }

    #[test]
    fn test_two_pass_order_with_fences() {
        let mut backend = MockBackend::default();
        let kernels = KernelRegistry::load_all(&mut backend, &KernelSource::Embedded).unwrap();
        let input = backend.create_image(Extent::new(256, 256)).unwrap();
        let output = backend.create_image(Extent::new(1024, 1024)).unwrap();
        let params = backend.create_param_buffer(96).unwrap();
        backend.clear_events();

        let grid = DispatchEngine
            .dispatch(&mut backend, PipelineMode::TwoPassSharpened, &kernels, &params, &input, &output, Extent::new(1024, 1024))
            .unwrap();

        assert_eq!(grid, DispatchGrid { x: 64, y: 64, z: 1 });
        assert_eq!(
            backend.events(),
            &[
                MockEvent::Submit {
                    role: KernelRole::EdgeAdaptiveUpsample,
                    source: Some(input.id),
                    target: output.id,
                    params: params.id,
                    grid,
                },
                MockEvent::Fence,
                MockEvent::Submit {
                    role: KernelRole::Sharpen,
                    source: None,
                    target: output.id,
                    params: params.id,
                    grid,
                },
                MockEvent::Fence,
            ]
        );
    }

    #[test]
    fn test_single_pass() {
        let mut backend = MockBackend::default();
        let kernels = KernelRegistry::load_all(&mut backend, &KernelSource::Embedded).unwrap();
        let input = backend.create_image(Extent::new(256, 256)).unwrap();
        let output = backend.create_image(Extent::new(512, 512)).unwrap();
        let params = backend.create_param_buffer(96).unwrap();
        backend.clear_events();

        let grid = DispatchEngine
            .dispatch(&mut backend, PipelineMode::SinglePassSmoothed, &kernels, &params, &input, &output, Extent::new(512, 512))
            .unwrap();

        assert_eq!(grid, DispatchGrid { x: 32, y: 32, z: 1 });
        assert_eq!(backend.submitted_roles(), vec![KernelRole::BilinearUpsample]);
        assert_eq!(backend.events().last(), Some(&MockEvent::Fence));
    }

    #[test]
    fn test_failed_upsample_skips_sharpen() {
        let mut backend = MockBackend::default();
        let kernels = KernelRegistry::load_all(&mut backend, &KernelSource::Embedded).unwrap();
        let input = backend.create_image(Extent::new(8, 8)).unwrap();
        let output = backend.create_image(Extent::new(16, 16)).unwrap();
        let params = backend.create_param_buffer(96).unwrap();
        backend.fail_next_submit("device lost");

        let err = DispatchEngine
            .dispatch(&mut backend, PipelineMode::TwoPassSharpened, &kernels, &params, &input, &output, Extent::new(16, 16))
            .unwrap_err();

        assert!(matches!(err, crate::FsrError::DeviceExecution { kernel: "easu", .. }), "{err}");
        assert!(backend.submitted_roles().is_empty());
    }
}
