//! Packed kernel constants
//!
//! Both upscaler variants read one uniform block holding the edge-adaptive upsample
//! coefficients, the sharpen coefficient, and the input/output extents. The layout
//! below is shared byte-for-byte with the `FsrConstants` struct declared in every
//! bundled kernel, so field order, size, and alignment must not change.

use crate::Extent;

/// Uniform block uploaded to the parameter buffer
///
/// Floating-point coefficients are stored as their IEEE-754 bit patterns and
/// bitcast back to `f32` inside the kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ConstantBlock {
    /// Output-to-input scale (xy) and pixel-centre offset (zw)
    pub easu_con0: [u32; 4],
    /// Reciprocal input size (xy) and tap offset of the top row (zw)
    pub easu_con1: [u32; 4],
    /// Tap offsets of the left and right middle taps
    pub easu_con2: [u32; 4],
    /// Tap offset of the bottom row (xy); zw unused
    pub easu_con3: [u32; 4],
    /// Sharpen attenuation as f32 (x) and as a packed f16 pair (y); zw unused
    pub rcas_con: [u32; 4],
    /// Input extent in pixels
    pub input_extent: [u32; 2],
    /// Output extent in pixels
    pub output_extent: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<ConstantBlock>() == 96);

impl ConstantBlock {
    /// Size of the uploaded blob in bytes
    pub const SIZE: u64 = std::mem::size_of::<ConstantBlock>() as u64;

    /// Raw bytes uploaded to the parameter buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Input extent embedded in the block
    pub fn input_extent(&self) -> Extent {
        Extent::new(self.input_extent[0], self.input_extent[1])
    }

    /// Output extent embedded in the block
    pub fn output_extent(&self) -> Extent {
        Extent::new(self.output_extent[0], self.output_extent[1])
    }

    /// Linear sharpen attenuation, `2^-sharpness`
    pub fn rcas_attenuation(&self) -> f32 {
        f32::from_bits(self.rcas_con[0])
    }
}

/// Derives the packed constants for an input/output extent pair and a sharpness
///
/// Pure and deterministic: identical arguments always produce byte-identical blocks.
///
/// # Arguments
/// * `input` - Extent of the source image
/// * `output` - Extent of the upscaled image
/// * `sharpness` - Sharpening in stops; 0 is the strongest, each +1 halves it
pub fn derive_constants(input: Extent, output: Extent, sharpness: f32) -> ConstantBlock {
    let (in_w, in_h) = (input.width as f32, input.height as f32);
    let (out_w, out_h) = (output.width as f32, output.height as f32);
    let rcp_in_w = 1.0 / in_w;
    let rcp_in_h = 1.0 / in_h;

    // Output pixel centres mapped into input pixel space
    let scale_x = in_w * (1.0 / out_w);
    let scale_y = in_h * (1.0 / out_h);

    ConstantBlock {
        easu_con0: bits([scale_x, scale_y, 0.5 * scale_x - 0.5, 0.5 * scale_y - 0.5]),
        easu_con1: bits([rcp_in_w, rcp_in_h, 1.0 * rcp_in_w, -2.0 * rcp_in_h]),
        easu_con2: bits([-1.0 * rcp_in_w, 2.0 * rcp_in_h, 1.0 * rcp_in_w, 2.0 * rcp_in_h]),
        easu_con3: bits([0.0 * rcp_in_w, 4.0 * rcp_in_h, 0.0, 0.0]),
        rcas_con: rcas_con(sharpness),
        input_extent: [input.width, input.height],
        output_extent: [output.width, output.height],
    }
}

fn bits(values: [f32; 4]) -> [u32; 4] {
    values.map(f32::to_bits)
}

fn rcas_con(sharpness: f32) -> [u32; 4] {
    let attenuation = (-sharpness).exp2();
    let half = half::f16::from_f32(attenuation).to_bits() as u32;
    [attenuation.to_bits(), half | (half << 16), 0, 0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(bits: u32) -> f32 {
        f32::from_bits(bits)
    }

    #[test]
    fn test_block_is_deterministic() {
        let a = derive_constants(Extent::new(256, 256), Extent::new(1024, 1024), 0.25);
        let b = derive_constants(Extent::new(256, 256), Extent::new(1024, 1024), 0.25);
        assert_eq!(a.as_bytes(), b.as_bytes());

        let c = derive_constants(Extent::new(256, 256), Extent::new(1024, 1024), 0.5);
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_block_layout() {
        assert_eq!(ConstantBlock::SIZE, 96);
        assert_eq!(std::mem::offset_of!(ConstantBlock, rcas_con), 64);
        assert_eq!(std::mem::offset_of!(ConstantBlock, input_extent), 80);
        assert_eq!(std::mem::offset_of!(ConstantBlock, output_extent), 88);

        let block = derive_constants(Extent::new(256, 200), Extent::new(1024, 800), 0.25);
        let bytes = block.as_bytes();
        assert_eq!(bytes.len(), 96);
        assert_eq!(&bytes[80..84], &256u32.to_ne_bytes());
        assert_eq!(&bytes[84..88], &200u32.to_ne_bytes());
        assert_eq!(&bytes[88..92], &1024u32.to_ne_bytes());
        assert_eq!(&bytes[92..96], &800u32.to_ne_bytes());
    }

    #[test]
    fn test_extents_are_embedded() {
        let block = derive_constants(Extent::new(256, 256), Extent::new(1024, 1024), 0.25);
        assert_eq!(block.input_extent(), Extent::new(256, 256));
        assert_eq!(block.output_extent(), Extent::new(1024, 1024));
    }

    #[test]
    fn test_easu_mapping() {
        let block = derive_constants(Extent::new(256, 128), Extent::new(1024, 256), 0.0);
        assert_eq!(f(block.easu_con0[0]), 0.25);
        assert_eq!(f(block.easu_con0[1]), 0.5);
        assert_eq!(f(block.easu_con0[2]), -0.375);
        assert_eq!(f(block.easu_con0[3]), -0.25);
        assert_eq!(f(block.easu_con1[0]), 1.0 / 256.0);
        assert_eq!(f(block.easu_con1[3]), -2.0 / 128.0);
        assert_eq!(f(block.easu_con3[1]), 4.0 / 128.0);
        assert_eq!(block.easu_con3[2..], [0, 0]);
    }

    #[test]
    fn test_rcas_attenuation() {
        let max = derive_constants(Extent::new(4, 4), Extent::new(8, 8), 0.0);
        assert_eq!(max.rcas_attenuation(), 1.0);
        assert_eq!(max.rcas_con[1], 0x3c00_3c00);

        let one_stop = derive_constants(Extent::new(4, 4), Extent::new(8, 8), 1.0);
        assert_eq!(one_stop.rcas_attenuation(), 0.5);

        let quarter = derive_constants(Extent::new(4, 4), Extent::new(8, 8), 0.25);
        assert!((quarter.rcas_attenuation() - 0.840_896_4).abs() < 1e-6);
        assert_eq!(quarter.rcas_con[2..], [0, 0]);
    }
}
