//! Runs the upscaler on a real adapter
//!
//! Every test returns early when no adapter is available or the adapter cannot bind
//! `rgba32float` as a read-write storage texture.

use fsr_wgpu::{ComputeBackend, Extent, FsrUpscaler, KernelSource, PipelineMode, WgpuBackend};

const COLOR: [f32; 4] = [0.5, 0.25, 0.75, 1.0];

fn backend() -> Option<WgpuBackend> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let Ok(adapter) = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())) else {
        eprintln!("no adapter available, skipping");
        return None;
    };
    if !WgpuBackend::supports_in_place_sharpen(&adapter) {
        eprintln!("{} lacks read-write rgba32float storage, skipping", adapter.get_info().name);
        return None;
    }
    WgpuBackend::request(&adapter).ok()
}

fn solid_input(backend: &mut WgpuBackend, extent: Extent) -> wgpu::Texture {
    let texels: Vec<f32> = COLOR.iter().copied().cycle().take(extent.pixel_count() as usize * 4).collect();
    backend.upload_image(extent, &texels).unwrap()
}

fn upscaler(backend: WgpuBackend, input: &wgpu::Texture, output_extent: Extent) -> FsrUpscaler<'_, WgpuBackend> {
    let input_extent = Extent::new(input.width(), input.height());
    FsrUpscaler::initialize(backend, input, input_extent, output_extent, 0.25, &KernelSource::Embedded).unwrap()
}

fn assert_solid(texels: &[f32], extent: Extent) {
    assert_eq!(texels.len() as u64, extent.pixel_count() * 4);
    for (i, texel) in texels.chunks_exact(4).enumerate() {
        for channel in 0..3 {
            assert!((texel[channel] - COLOR[channel]).abs() < 1e-2, "texel {i} channel {channel}: {texel:?}");
        }
    }
}

#[test]
fn test_two_pass_upscale_of_solid_image() {
    let Some(mut backend) = backend() else { return };
    let input = solid_input(&mut backend, Extent::new(32, 20));
    let output_extent = Extent::new(64, 40);
    let mut upscaler = upscaler(backend, &input, output_extent);

    let output = upscaler.output().unwrap();
    assert_eq!((output.width(), output.height()), (64, 40));
    assert_solid(&upscaler.backend().read_image(output).unwrap(), output_extent);

    upscaler.shutdown();
}

#[test]
fn test_bilinear_after_resize() {
    let Some(mut backend) = backend() else { return };
    let input = solid_input(&mut backend, Extent::new(24, 24));
    let mut upscaler = upscaler(backend, &input, Extent::new(48, 48));

    let output_extent = Extent::new(37, 53);
    upscaler.configure(output_extent, 0.25, PipelineMode::SinglePassSmoothed).unwrap();

    let output = upscaler.output().unwrap();
    assert_solid(&upscaler.backend().read_image(output).unwrap(), output_extent);

    upscaler.shutdown();
}

#[test]
fn test_device_limit_rejects_oversized_output() {
    let Some(mut backend) = backend() else { return };
    let limit = backend.max_image_dimension();
    let input = solid_input(&mut backend, Extent::new(16, 16));
    let mut upscaler = upscaler(backend, &input, Extent::new(32, 32));

    assert!(upscaler.on_resize(Extent::new(limit + 1, 16)).is_err());
    assert_eq!(upscaler.output_extent(), Some(Extent::new(32, 32)));

    upscaler.shutdown();
}
