//! WGSL shader minification utilities.
//!
//! This module provides functionality to reduce the size of WGSL kernel source code
//! before it is embedded into the library.

use crate::validate::validate_module;

/// Minifies WGSL kernel source code to reduce binary size.
///
/// Uses `naga` to parse, validate, and regenerate the WGSL code in a more compact form.
/// Entry points are preserved, so the minified source can be compiled with the same
/// entry point names as the unminified source.
///
/// # Arguments
///
/// * `shader` - A string slice containing the WGSL source code.
///
/// # Returns
///
/// A `Result` containing the minified WGSL source code as a `String`, or an error if parsing fails.
pub fn minify_wgsl(shader: &str) -> Result<String, std::boxed::Box<dyn std::error::Error>> {
    let mut module = naga::front::wgsl::parse_str(shader).map_err(|e| e.emit_to_string(shader))?;

    wgsl_minifier::minify_module(&mut module);

    let info = validate_module(&module).map_err(|e| e.emit_to_string(shader))?;
    let output = naga::back::wgsl::write_string(&module, &info, naga::back::wgsl::WriterFlags::empty())?;

    Ok(wgsl_minifier::minify_wgsl_source(&output))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSTHROUGH: &str = r#"
@group(0) @binding(1) var input_image: texture_2d<f32>;
@group(0) @binding(2) var output_image: texture_storage_2d<rgba32float, write>;

// Copies the source texel unchanged
@compute @workgroup_size(16, 16, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let value = textureLoad(input_image, vec2<i32>(gid.xy), 0);
    textureStore(output_image, vec2<i32>(gid.xy), value);
}
"#;

    #[test]
    fn test_minify_keeps_entry_point() {
        let minified = minify_wgsl(PASSTHROUGH).unwrap();
        assert!(minified.len() < PASSTHROUGH.len());
        assert!(!minified.contains("Copies the source texel"));

        let validated = crate::validate_wgsl(&minified, "main").unwrap();
        assert_eq!(validated.workgroup_size, [16, 16, 1]);
    }

    #[test]
    fn test_minify_rejects_invalid_source() {
        assert!(minify_wgsl("fn main( {").is_err());
    }
}
