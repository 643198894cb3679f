//! Upscale pipeline orchestrator
//!
//! [`FsrUpscaler`] ties the kernel registry, resource manager, and dispatch engine
//! together behind `initialize` / `configure` / `shutdown`. A value of this type only
//! exists once initialization succeeded, so there is no uninitialized state to check.

use crate::{
    ComputeBackend, DispatchEngine, DispatchGrid, Extent, FsrError, ImageBuffer, KernelRegistry, KernelSource, PipelineMode, ResourceManager, Result,
    derive_constants,
};
use tracing::{debug, info, warn};

/// Parameters of the most recent successful dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpscaleSettings {
    /// Extent of the output image
    pub output_extent: Extent,
    /// Sharpening in stops, 0 is the strongest
    pub sharpness: f32,
    /// Kernel chain
    pub mode: PipelineMode,
}

/// Runtime state of an upscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscalerState {
    /// Output is fully resolved and parameters may change
    Ready,
    /// A dispatch of the given mode is in progress
    Running(PipelineMode),
    /// Resources were released; every operation fails
    ShutDown,
}

/// Drives the upscale pipeline for one input image
///
/// All calls block until the device finished every pass, so the output image can be
/// read as soon as a call returns. The input image is borrowed for the lifetime of
/// the upscaler and stays owned by the caller.
pub struct FsrUpscaler<'a, B: ComputeBackend> {
    backend: B,
    kernels: KernelRegistry<B>,
    resources: ResourceManager<B>,
    dispatcher: DispatchEngine,
    input: &'a B::Image,
    input_extent: Extent,
    settings: UpscaleSettings,
    state: UpscalerState,
}

impl<'a, B: ComputeBackend> FsrUpscaler<'a, B> {
    /// Loads kernels, allocates resources, and produces the first output
    ///
    /// The first dispatch uses the default mode, so a valid output exists before
    /// anything reads it.
    ///
    /// # Arguments
    /// * `backend` - Device that runs the pipeline
    /// * `input` - Source image; only read, never destroyed by the upscaler
    /// * `input_extent` - Extent of `input`
    /// * `initial_output_extent` - Extent of the first output image
    /// * `initial_sharpness` - Sharpening in stops
    /// * `kernel_source` - Where the kernel sources are read from
    ///
    /// # Errors
    /// Any kernel, allocation, or device error. Resources allocated before the
    /// failure are released again.
    pub fn initialize(
        backend: B,
        input: &'a B::Image,
        input_extent: Extent,
        initial_output_extent: Extent,
        initial_sharpness: f32,
        kernel_source: &KernelSource,
    ) -> Result<Self> {
        validate_sharpness(initial_sharpness)?;
        let mut backend = backend;
        let kernels = KernelRegistry::load_all(&mut backend, kernel_source)?;

        let settings = UpscaleSettings {
            output_extent: initial_output_extent,
            sharpness: initial_sharpness,
            mode: PipelineMode::default(),
        };
        let mut upscaler = Self {
            backend,
            kernels,
            resources: ResourceManager::new(),
            dispatcher: DispatchEngine,
            input,
            input_extent,
            settings,
            state: UpscalerState::Ready,
        };

        if let Err(e) = upscaler.apply(settings) {
            upscaler.shutdown();
            return Err(e);
        }
        info!(input = %input_extent, output = %initial_output_extent, "upscaler initialized");
        Ok(upscaler)
    }

    /// Applies new parameters and re-runs the pipeline
    ///
    /// The output image is replaced if the extent changed, the constants are always
    /// re-derived and uploaded, and every pass of `mode` is dispatched even when the
    /// arguments equal the previous call.
    ///
    /// # Returns
    /// The output image, fully written
    ///
    /// # Errors
    /// `InvalidSharpness` before any device work, `ResourceAllocation` with the
    /// previous output left intact, `DeviceExecution` if a pass fails, and `ShutDown`
    /// after [`shutdown`](Self::shutdown). Settings are only recorded on success.
    ///
    /// A failed dispatch into a new extent discards the new image and keeps the
    /// previous one. A failed dispatch at the current extent may leave that image
    /// partially written until the next successful call.
    pub fn configure(&mut self, output_extent: Extent, sharpness: f32, mode: PipelineMode) -> Result<&B::Image> {
        self.ensure_active()?;
        validate_sharpness(sharpness)?;

        let settings = UpscaleSettings {
            output_extent,
            sharpness,
            mode,
        };
        match self.apply(settings) {
            Ok(grid) => {
                info!(output = %output_extent, sharpness, %mode, workgroups = grid.workgroup_count(), "configured upscaler");
                self.settings = settings;
            }
            Err(e) => {
                warn!(output = %output_extent, sharpness, %mode, error = %e, "configure failed");
                return Err(e);
            }
        }

        self.output().ok_or(FsrError::ShutDown)
    }

    /// Configures an output extent of `input_extent * factor`, rounded per dimension
    pub fn configure_scale(&mut self, factor: f64, sharpness: f32, mode: PipelineMode) -> Result<&B::Image> {
        let output_extent = self.input_extent.scaled(factor);
        self.configure(output_extent, sharpness, mode)
    }

    /// Re-runs the pipeline with the current settings
    pub fn run(&mut self) -> Result<&B::Image> {
        let UpscaleSettings {
            output_extent,
            sharpness,
            mode,
        } = self.settings;
        self.configure(output_extent, sharpness, mode)
    }

    /// Changes only the output extent, keeping sharpness and mode
    pub fn on_resize(&mut self, output_extent: Extent) -> Result<&B::Image> {
        self.configure(output_extent, self.settings.sharpness, self.settings.mode)
    }

    /// Destroys the output image and the parameter buffer
    ///
    /// Kernels stay alive until the upscaler is dropped. Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        if self.state == UpscalerState::ShutDown {
            return;
        }
        self.resources.release(&mut self.backend);
        self.state = UpscalerState::ShutDown;
        info!("upscaler shut down");
    }

    /// Current output image, `None` after shutdown
    pub fn output(&self) -> Option<&B::Image> {
        self.resources.output().map(ImageBuffer::handle)
    }

    /// Extent of the current output image
    pub fn output_extent(&self) -> Option<Extent> {
        self.resources.output().map(ImageBuffer::extent)
    }

    /// Source image handle, borrowed from the caller
    pub fn input(&self) -> &'a B::Image {
        self.input
    }

    /// Extent of the source image
    pub fn input_extent(&self) -> Extent {
        self.input_extent
    }

    /// Parameters of the last successful dispatch
    pub fn settings(&self) -> UpscaleSettings {
        self.settings
    }

    /// Whether the upscaler is idle, dispatching, or shut down
    pub fn state(&self) -> UpscalerState {
        self.state
    }

    /// Device the pipeline runs on
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the device, e.g. to upload or read back images
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            UpscalerState::ShutDown => Err(FsrError::ShutDown),
            _ => Ok(()),
        }
    }

    fn apply(&mut self, settings: UpscaleSettings) -> Result<DispatchGrid> {
        self.state = UpscalerState::Running(settings.mode);
        let result = self.prepare_and_dispatch(settings);
        match result {
            Ok(_) => self.resources.commit(&mut self.backend),
            Err(_) => self.resources.rollback(&mut self.backend),
        }
        self.state = UpscalerState::Ready;
        result
    }

    fn prepare_and_dispatch(&mut self, settings: UpscaleSettings) -> Result<DispatchGrid> {
        let block = derive_constants(self.input_extent, settings.output_extent, settings.sharpness);
        let (output, params) = self.resources.prepare(&mut self.backend, settings.output_extent, &block)?;
        debug!(input = %self.input_extent, output = %output.extent(), "uploaded constants");

        self.dispatcher
            .dispatch(&mut self.backend, settings.mode, &self.kernels, params, self.input, output.handle(), output.extent())
    }
}

impl<B: ComputeBackend> Drop for FsrUpscaler<'_, B> {
    fn drop(&mut self) {
        if self.state != UpscalerState::ShutDown {
            debug!("upscaler dropped without shutdown, resources go away with the backend");
        }
    }
}

fn validate_sharpness(sharpness: f32) -> Result<()> {
    if sharpness.is_finite() && sharpness >= 0.0 {
        Ok(())
    } else {
        Err(FsrError::InvalidSharpness(sharpness))
    }
}
