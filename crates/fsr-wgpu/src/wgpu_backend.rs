//! wgpu implementation of [`ComputeBackend`]
//!
//! Images are `Rgba32Float` textures and the parameter buffer is a uniform buffer.
//! Every kernel gets an explicit bind group layout matching the kernel interface,
//! and bind groups are built per dispatch from the handles named in the invocation.

use crate::{ComputeBackend, ConstantBlock, Extent, FsrError, KernelInput, KernelInvocation, KernelRole, Result};
use std::num::NonZeroU64;
use tracing::debug;

/// Bytes per texel of an `Rgba32Float` image
const BYTES_PER_TEXEL: u32 = 16;

/// Compiled compute pipeline together with its bind group layout
#[derive(Debug)]
pub struct WgpuKernel {
    role: KernelRole,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl WgpuKernel {
    /// Stage this kernel was compiled for
    pub fn role(&self) -> KernelRole {
        self.role
    }
}

/// Upscale pipeline backend running on a wgpu device
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    /// Device features the backend needs
    ///
    /// The in-place sharpen pass binds the output as a read-write `rgba32float`
    /// storage texture, which is an adapter-specific format capability.
    pub const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;

    /// Format of every image the backend creates
    pub const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

    /// Wraps a device created with [`REQUIRED_FEATURES`](Self::REQUIRED_FEATURES)
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Requests a device with the required features and default limits
    pub fn request(adapter: &wgpu::Adapter) -> std::result::Result<Self, wgpu::RequestDeviceError> {
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("FSR Upscaler"),
            required_features: Self::REQUIRED_FEATURES,
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))?;
        Ok(Self::new(device, queue))
    }

    /// Whether `adapter` can bind `rgba32float` as a read-write storage texture
    pub fn supports_in_place_sharpen(adapter: &wgpu::Adapter) -> bool {
        adapter.features().contains(Self::REQUIRED_FEATURES)
            && adapter
                .get_texture_format_features(Self::IMAGE_FORMAT)
                .flags
                .contains(wgpu::TextureFormatFeatureFlags::STORAGE_READ_WRITE)
    }

    /// Logical device the pipelines and images were created on
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Queue every pass is submitted to
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates an input image from tightly packed RGBA `f32` texels
    ///
    /// The returned texture belongs to the caller; the upscaler only reads it.
    ///
    /// # Errors
    /// `ResourceAllocation` if the extent is invalid, `rgba` has the wrong length,
    /// or the device cannot allocate the texture.
    pub fn upload_image(&mut self, extent: Extent, rgba: &[f32]) -> Result<wgpu::Texture> {
        let expected = extent.pixel_count() * 4;
        if rgba.len() as u64 != expected {
            return Err(FsrError::ResourceAllocation {
                extent,
                reason: format!("expected {expected} channel values, got {}", rgba.len()),
            });
        }

        let texture = self.create_image(extent)?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(rgba),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(extent.width * BYTES_PER_TEXEL),
                rows_per_image: Some(extent.height),
            },
            extent_3d(extent),
        );
        debug!(%extent, "uploaded input image");
        Ok(texture)
    }

    /// Copies an image back to the host as tightly packed RGBA `f32` texels
    ///
    /// Waits for all submitted work first, so the result reflects every finished pass.
    pub fn read_image(&self, image: &wgpu::Texture) -> Result<Vec<f32>> {
        let readback_error = |reason: String| FsrError::DeviceExecution { kernel: "readback", reason };

        let (width, height) = (image.width(), image.height());
        let row_bytes = width * BYTES_PER_TEXEL;
        let padded_row_bytes = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded_row_bytes as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: image,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            image.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = sender.send(v);
        });
        self.device.poll(wgpu::PollType::Wait).map_err(|e| readback_error(e.to_string()))?;
        pollster::block_on(receiver.receive())
            .ok_or_else(|| readback_error("map callback was dropped".to_string()))?
            .map_err(|e| readback_error(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let mut texels = Vec::with_capacity((width * height * 4) as usize);
        for row in data.chunks_exact(padded_row_bytes as usize) {
            texels.extend_from_slice(bytemuck::cast_slice::<u8, f32>(&row[..row_bytes as usize]));
        }
        drop(data);
        buffer.unmap();

        Ok(texels)
    }

    /// Runs `f` inside validation and out-of-memory error scopes
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(out_of_memory))
    }
}

fn extent_3d(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

fn bind_group_layout_entries(role: KernelRole) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(ConstantBlock::SIZE),
        },
        count: None,
    }];

    let target_access = if role.is_in_place() {
        wgpu::StorageTextureAccess::ReadWrite
    } else {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        wgpu::StorageTextureAccess::WriteOnly
    };

    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 2,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: target_access,
            format: WgpuBackend::IMAGE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    });
    entries
}

impl ComputeBackend for WgpuBackend {
    type Image = wgpu::Texture;
    type ParamBuffer = wgpu::Buffer;
    type Kernel = WgpuKernel;

    fn max_image_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn compile_kernel(&mut self, role: KernelRole, source: &str, entry_point: &str) -> Result<WgpuKernel> {
        let (kernel, error) = self.scoped(|| {
            let shader_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(role.name()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(role.name()),
                entries: &bind_group_layout_entries(role),
            });

            let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(role.name()),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(role.name()),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

            WgpuKernel {
                role,
                pipeline,
                bind_group_layout,
            }
        });

        match error {
            Some(error) => Err(FsrError::KernelCompile {
                kernel_name: role.name().to_string(),
                diagnostic: error.to_string(),
            }),
            None => Ok(kernel),
        }
    }

    fn create_image(&mut self, extent: Extent) -> Result<wgpu::Texture> {
        let (texture, error) = self.scoped(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("FSR Image"),
                size: extent_3d(extent),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Self::IMAGE_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });

        match error {
            Some(error) => {
                texture.destroy();
                Err(FsrError::ResourceAllocation {
                    extent,
                    reason: error.to_string(),
                })
            }
            None => Ok(texture),
        }
    }

    fn destroy_image(&mut self, image: wgpu::Texture) {
        image.destroy();
    }

    fn create_param_buffer(&mut self, size: u64) -> Result<wgpu::Buffer> {
        let (buffer, error) = self.scoped(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("FSR Constants"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        match error {
            Some(error) => {
                buffer.destroy();
                Err(FsrError::ResourceAllocation {
                    extent: Extent::new(1, 1),
                    reason: format!("parameter buffer of {size} bytes: {error}"),
                })
            }
            None => Ok(buffer),
        }
    }

    fn write_param_buffer(&mut self, buffer: &wgpu::Buffer, bytes: &[u8]) -> Result<()> {
        self.queue.write_buffer(buffer, 0, bytes);
        Ok(())
    }

    fn destroy_param_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn submit(&mut self, invocation: &KernelInvocation<'_, Self>) -> Result<()> {
        let role = invocation.role;
        let ((), error) = self.scoped(|| {
            let target_view = invocation.target.create_view(&wgpu::TextureViewDescriptor::default());
            let source_view = match invocation.source {
                KernelInput::Image(source) => Some(source.create_view(&wgpu::TextureViewDescriptor::default())),
                KernelInput::InPlace => None,
            };

            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: invocation.params.as_entire_binding(),
            }];
            if let Some(source_view) = &source_view {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source_view),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&target_view),
            });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(role.name()),
                layout: &invocation.kernel.bind_group_layout,
                entries: &entries,
            });

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(role.name()) });
            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(role.name()),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(&invocation.kernel.pipeline);
                compute_pass.set_bind_group(0, &bind_group, &[]);
                compute_pass.dispatch_workgroups(invocation.grid.x, invocation.grid.y, invocation.grid.z);
            }
            self.queue.submit(std::iter::once(encoder.finish()));
        });

        match error {
            Some(error) => Err(FsrError::DeviceExecution {
                kernel: role.name(),
                reason: error.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn fence(&mut self) -> Result<()> {
        self.device.poll(wgpu::PollType::Wait).map_err(|e| FsrError::DeviceExecution {
            kernel: "fence",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
