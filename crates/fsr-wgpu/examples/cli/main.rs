//! FSR CLI Image Upscaler
//!
//! Upscales an image on the GPU with an edge-adaptive upsample followed by a
//! contrast-adaptive sharpen, or with a plain bilinear upsample. With
//! `--interactive` the tool keeps the upscaler alive and reads tuning commands from
//! stdin, re-running the pipeline after every change.
//!
//! # Usage
//! ```bash
//! fsr-cli input.png --output output.png --preset quality --sharpness 0.5
//! fsr-cli input.png --width 1920 --height 1080 --mode bilinear
//! fsr-cli input.png --interactive
//! ```

mod interactive;

use clap::Parser;
use fsr_wgpu::presets::{PipelineMode, ScalePreset};
use fsr_wgpu::{Extent, FsrError, FsrUpscaler, KernelSource, WgpuBackend};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Scale applied when neither a scale, a preset, nor an explicit size is given
const DEFAULT_SCALE: f64 = 4.0;

/// Command-line arguments for the FSR image upscaler
#[derive(Parser)]
#[command(version, about = "CLI tool for upscaling images using FSR EASU + RCAS")]
struct Args {
    /// Input image file path
    input: PathBuf,

    /// Output image file path (defaults to `<input>_fsr.png`)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Scale factor per axis (e.g., 1.5 for 1.5x upscaling)
    #[arg(long, short, conflicts_with_all = ["preset", "width"])]
    scale: Option<f64>,

    /// Scale preset (ultra-quality, quality, balanced, performance, ultra)
    #[arg(long, short, conflicts_with = "width")]
    preset: Option<ScalePreset>,

    /// Output width in pixels
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Sharpness in stops; 0 is the strongest, each +1 halves it
    #[arg(long, default_value_t = 0.25)]
    sharpness: f32,

    /// Pipeline mode (fsr, bilinear)
    #[arg(long, short, default_value = "fsr")]
    mode: PipelineMode,

    /// Directory with kernel sources and an optional kernels.yaml manifest
    #[arg(long)]
    kernels: Option<PathBuf>,

    /// Read tuning commands from stdin after the first upscale
    #[arg(long, short)]
    interactive: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    /// Output extent requested on the command line
    fn output_extent(&self, input_extent: Extent) -> Extent {
        match (self.width, self.height, self.preset, self.scale) {
            (Some(width), Some(height), _, _) => Extent::new(width, height),
            (_, _, Some(preset), _) => input_extent.scaled(preset.scale_factor()),
            (_, _, _, Some(scale)) => input_extent.scaled(scale),
            _ => input_extent.scaled(DEFAULT_SCALE),
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string());
            self.input.with_file_name(format!("{stem}_fsr.png"))
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Loading image from: {}", args.input.display());
    let input_image = load_image(&args.input)?;
    let input_extent = Extent::new(input_image.width(), input_image.height());
    let output_extent = args.output_extent(input_extent);
    tracing::info!("Input image: {input_extent}, output: {output_extent}");

    tracing::info!("Initializing GPU...");
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;

    if !WgpuBackend::supports_in_place_sharpen(&adapter) {
        return Err(format!("{} cannot bind rgba32float as a read-write storage texture", adapter.get_info().name).into());
    }

    let mut backend = WgpuBackend::request(&adapter)?;
    tracing::info!("GPU initialized: {}", adapter.get_info().name);

    let input = backend.upload_image(input_extent, input_image.as_raw())?;
    let kernel_source = args.kernels.clone().map_or(KernelSource::Embedded, KernelSource::Directory);
    let mut upscaler = FsrUpscaler::initialize(backend, &input, input_extent, output_extent, args.sharpness, &kernel_source)?;
    if args.mode != upscaler.settings().mode {
        upscaler.configure(output_extent, args.sharpness, args.mode)?;
    }

    if args.interactive {
        interactive::run(&mut upscaler, &args.output_path())?;
    } else {
        save_output(&upscaler, &args.output_path())?;
    }

    upscaler.shutdown();
    Ok(())
}

/// Decodes an image file into RGBA32F texels
fn load_image(path: &Path) -> Result<image::Rgba32FImage, FsrError> {
    let decode_error = |reason: String| FsrError::InputDecode {
        path: path.to_path_buf(),
        reason,
    };

    let image = image::open(path).map_err(|e| decode_error(e.to_string()))?.to_rgba32f();
    if image.width() == 0 || image.height() == 0 {
        return Err(decode_error("image has no pixels".to_string()));
    }
    Ok(image)
}

/// Reads the current output image back and writes it as 8-bit RGBA
pub(crate) fn save_output(upscaler: &FsrUpscaler<'_, WgpuBackend>, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(output), Some(extent)) = (upscaler.output(), upscaler.output_extent()) else {
        return Err(FsrError::ShutDown.into());
    };

    let texels = upscaler.backend().read_image(output)?;
    let image = image::Rgba32FImage::from_raw(extent.width, extent.height, texels).ok_or("Failed to create RGBA32F image from data")?;
    DynamicImage::ImageRgba32F(image).to_rgba8().save(path)?;

    tracing::info!("Saved {extent} output to: {}", path.display());
    Ok(())
}
