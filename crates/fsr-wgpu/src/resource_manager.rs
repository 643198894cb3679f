//! Output image and parameter buffer lifetime
//!
//! Images never change size after creation: a new output extent always means a
//! new image. The replacement is allocated before the current image is released,
//! so a failed allocation leaves the previous output untouched. During a dispatch
//! the previous image is kept until the new one has been written.

use crate::{ComputeBackend, ConstantBlock, Extent, FsrError, Result};
use tracing::debug;

/// A device image together with the extent it was created with
pub struct ImageBuffer<B: ComputeBackend> {
    handle: B::Image,
    extent: Extent,
}

impl<B: ComputeBackend> ImageBuffer<B> {
    /// Device handle of the image
    pub fn handle(&self) -> &B::Image {
        &self.handle
    }

    /// Extent the image was created with
    pub fn extent(&self) -> Extent {
        self.extent
    }
}

/// Owner of the output image and the parameter buffer
///
/// Holds no CPU-side copy of either; the device is the only source of truth.
pub struct ResourceManager<B: ComputeBackend> {
    output: Option<ImageBuffer<B>>,
    params: Option<B::ParamBuffer>,
    /// Output image replaced by [`prepare`](Self::prepare), kept until the dispatch is settled
    retired: Option<ImageBuffer<B>>,
}

impl<B: ComputeBackend> Default for ResourceManager<B> {
    fn default() -> Self {
        Self {
            output: None,
            params: None,
            retired: None,
        }
    }
}

impl<B: ComputeBackend> ResourceManager<B> {
    /// Creates a manager that owns no resources yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Current output image, if one is allocated
    pub fn output(&self) -> Option<&ImageBuffer<B>> {
        self.output.as_ref()
    }

    /// Current parameter buffer, if constants were uploaded
    pub fn params(&self) -> Option<&B::ParamBuffer> {
        self.params.as_ref()
    }

    /// Allocates the output image
    ///
    /// If an output image already exists this behaves like
    /// [`resize_output_buffer`](Self::resize_output_buffer).
    ///
    /// # Errors
    /// `ResourceAllocation` if the extent is empty, exceeds the device limit, or
    /// the device cannot allocate it.
    pub fn create_output_buffer(&mut self, backend: &mut B, extent: Extent) -> Result<&ImageBuffer<B>> {
        self.resize_output_buffer(backend, extent)
    }

    /// Replaces the output image with a new one of `new_extent`
    ///
    /// The new image is allocated first; the previous one is destroyed only after
    /// the allocation succeeded.
    pub fn resize_output_buffer(&mut self, backend: &mut B, new_extent: Extent) -> Result<&ImageBuffer<B>> {
        validate_extent(backend, new_extent)?;
        let handle = backend.create_image(new_extent)?;

        let previous = self.output.take();
        let current = self.output.insert(ImageBuffer { handle, extent: new_extent });
        if let Some(previous) = previous {
            debug!(from = %previous.extent, to = %new_extent, "replacing output image");
            backend.destroy_image(previous.handle);
        } else {
            debug!(extent = %new_extent, "allocated output image");
        }

        Ok(&*current)
    }

    /// Makes sure the output image has exactly `extent`
    ///
    /// # Returns
    /// `true` if a new image was allocated, `false` if the current one already matched
    pub fn ensure_output_extent(&mut self, backend: &mut B, extent: Extent) -> Result<bool> {
        if self.output.as_ref().is_some_and(|output| output.extent == extent) {
            return Ok(false);
        }
        self.resize_output_buffer(backend, extent)?;
        Ok(true)
    }

    /// Uploads a constant block, replacing the previous content
    ///
    /// The parameter buffer is created on first upload and reused afterwards; the
    /// block has a fixed size so the buffer never needs to grow.
    pub fn upload_constants(&mut self, backend: &mut B, block: &ConstantBlock) -> Result<&B::ParamBuffer> {
        let params = match self.params.take() {
            Some(params) => params,
            None => {
                debug!(size = ConstantBlock::SIZE, "allocated parameter buffer");
                backend.create_param_buffer(ConstantBlock::SIZE)?
            }
        };
        let params = self.params.insert(params);
        backend.write_param_buffer(params, block.as_bytes())?;
        Ok(&*params)
    }

    /// Brings both resources up to date for one dispatch
    ///
    /// Allocates a new output image if `extent` differs from the current one, then
    /// uploads `block`. Both steps finish before the handles are returned. The
    /// previous output image stays alive until [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback) settles the dispatch.
    pub fn prepare(&mut self, backend: &mut B, extent: Extent, block: &ConstantBlock) -> Result<(&ImageBuffer<B>, &B::ParamBuffer)> {
        self.stage_output(backend, extent)?;
        self.upload_constants(backend, block)?;
        match (&self.output, &self.params) {
            (Some(output), Some(params)) => Ok((output, params)),
            _ => Err(FsrError::ResourceAllocation {
                extent,
                reason: "resources were released during preparation".to_string(),
            }),
        }
    }

    fn stage_output(&mut self, backend: &mut B, extent: Extent) -> Result<()> {
        if self.output.as_ref().is_some_and(|output| output.extent == extent) {
            return Ok(());
        }
        validate_extent(backend, extent)?;
        let handle = backend.create_image(extent)?;

        if let Some(stale) = self.retired.take() {
            backend.destroy_image(stale.handle);
        }
        self.retired = self.output.replace(ImageBuffer { handle, extent });
        debug!(%extent, "staged output image");
        Ok(())
    }

    /// Destroys the output image replaced by the last [`prepare`](Self::prepare)
    pub fn commit(&mut self, backend: &mut B) {
        if let Some(previous) = self.retired.take() {
            debug!(from = %previous.extent, "released previous output image");
            backend.destroy_image(previous.handle);
        }
    }

    /// Restores the output image replaced by the last [`prepare`](Self::prepare)
    ///
    /// The staged image is destroyed. Does nothing if `prepare` kept the current image.
    pub fn rollback(&mut self, backend: &mut B) {
        if let Some(previous) = self.retired.take() {
            if let Some(staged) = self.output.replace(previous) {
                debug!(extent = %staged.extent, "discarded staged output image");
                backend.destroy_image(staged.handle);
            }
        }
    }

    /// Destroys the output image and the parameter buffer
    pub fn release(&mut self, backend: &mut B) {
        if let Some(retired) = self.retired.take() {
            backend.destroy_image(retired.handle);
        }
        if let Some(output) = self.output.take() {
            backend.destroy_image(output.handle);
        }
        if let Some(params) = self.params.take() {
            backend.destroy_param_buffer(params);
        }
    }
}

fn validate_extent<B: ComputeBackend>(backend: &B, extent: Extent) -> Result<()> {
    if extent.is_empty() {
        return Err(FsrError::ResourceAllocation {
            extent,
            reason: "both dimensions must be at least 1".to_string(),
        });
    }

    let limit = backend.max_image_dimension();
    if extent.width > limit || extent.height > limit {
        return Err(FsrError::ResourceAllocation {
            extent,
            reason: format!("exceeds the device limit of {limit} pixels per dimension"),
        });
    }

    Ok(())
}
