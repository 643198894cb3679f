//! Error types for the upscale pipeline

use crate::Extent;
use std::path::PathBuf;

/// Errors surfaced by the upscale pipeline
///
/// All errors are returned synchronously to the immediate caller; the pipeline never
/// retries and never swallows a failure.
#[derive(Debug, thiserror::Error)]
pub enum FsrError {
    /// A kernel failed to parse, validate, or build into a compute pipeline
    #[error("failed to compile kernel `{kernel_name}`:\n{diagnostic}")]
    KernelCompile {
        /// Name of the kernel that failed
        kernel_name: String,
        /// Compiler diagnostic text
        diagnostic: String,
    },

    /// A kernel source file could not be read
    #[error("cannot read kernel source {}: {source}", .path.display())]
    KernelSourceUnavailable {
        /// Path of the missing or unreadable source
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A GPU resource could not be allocated
    #[error("cannot allocate {extent} image: {reason}")]
    ResourceAllocation {
        /// Requested extent
        extent: Extent,
        /// Why the allocation failed
        reason: String,
    },

    /// The device reported an error while executing a kernel
    #[error("device error while running {kernel}: {reason}")]
    DeviceExecution {
        /// Kernel being executed, or the device operation that failed
        kernel: &'static str,
        /// Device error text
        reason: String,
    },

    /// The input image could not be decoded or uploaded
    #[error("cannot load input image {}: {reason}", .path.display())]
    InputDecode {
        /// Path of the input image
        path: PathBuf,
        /// Decoder error text
        reason: String,
    },

    /// Sharpness must be a finite, non-negative number of stops
    #[error("invalid sharpness {0}: expected a finite value >= 0")]
    InvalidSharpness(f32),

    /// The upscaler was shut down and accepts no further operations
    #[error("upscaler has been shut down")]
    ShutDown,
}

/// Result type used throughout the crate
pub type Result<T, E = FsrError> = std::result::Result<T, E>;
