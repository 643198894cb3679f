//! Image extents and output-resolution scaling

use std::fmt;

/// Width and height of a GPU image in pixels
///
/// An image is created against one extent and keeps it for its whole lifetime;
/// images with an empty extent are never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent {
    /// Creates an extent from width and height
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by this extent
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Scales both dimensions by `factor`
    ///
    /// Each dimension is rounded independently to the nearest integer, with halves
    /// rounded away from zero, and clamped to at least one pixel. Non-finite or
    /// non-positive factors yield a 1x1 extent.
    ///
    /// # Arguments
    /// * `factor` - Scale factor applied to both dimensions (e.g., 4.0 for 4x upscaling)
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            width: scale_dimension(self.width, factor),
            height: scale_dimension(self.height, factor),
        }
    }
}

fn scale_dimension(dimension: u32, factor: f64) -> u32 {
    let scaled = (dimension as f64 * factor).round();
    if scaled.is_nan() || scaled < 1.0 {
        1
    } else if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Extent {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}
