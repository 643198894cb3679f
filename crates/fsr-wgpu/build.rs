//! Build script for the fsr-wgpu crate
//!
//! Validates the bundled WGSL kernels and embeds them, minified, as string constants.
//! A kernel that fails naga validation or declares the wrong entry point fails the build.

use fsr_wgpu_build::{minify_wgsl, validate_wgsl};

/// Bundled kernels as (constant name, file under `kernels/`)
const KERNELS: [(&str, &str); 3] = [("EASU", "easu.wgsl"), ("RCAS", "rcas.wgsl"), ("BILINEAR", "bilinear.wgsl")];

/// Converts WGSL source into a Rust string literal
fn dump_shader_string_literal(shader: &str) -> String {
    let escaped_shader = shader.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{escaped_shader}\"")
}

fn dump_kernel_decl(id: &str, path: &str) -> String {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read kernel {path}: {e}"));

    let validated = validate_wgsl(&source, "main").unwrap_or_else(|e| panic!("Invalid kernel {path}:\n{e}"));
    assert_eq!(validated.workgroup_size, [16, 16, 1], "kernel {path} must use @workgroup_size(16, 16, 1)");

    let minified = minify_wgsl(&source).unwrap_or_else(|e| panic!("Failed to minify kernel {path}: {e}"));
    format!("pub const {id}: &str = {};\n", dump_shader_string_literal(&minified))
}

fn main() {
    let project_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");

    let mut code = String::new();
    code.push_str("// GENERATED CODE. DO NOT EDIT.\n\n");
    for (id, file) in KERNELS {
        let path = format!("{project_dir}/kernels/{file}");
        println!("cargo:rerun-if-changed={path}");
        code.push_str(&dump_kernel_decl(id, &path));
    }

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let output_path = std::path::PathBuf::from(out_dir).join("kernels.rs");
    std::fs::write(output_path, code).expect("Failed to write kernels.rs");
}
