//! Kernel directory checker
//!
//! This binary validates a directory of upscaler kernels the same way the runtime
//! kernel registry does: it reads the optional `kernels.yaml` manifest, parses and
//! validates each kernel with naga, and reports the declared workgroup sizes.

use fsr_wgpu_build::manifest::KernelManifest;
use fsr_wgpu_build::validate_wgsl;
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <kernel-directory>", args[0]);
        eprintln!("Validates easu, rcas and bilinear kernels found in the directory");
        process::exit(1);
    }

    let dir = Path::new(&args[1]);
    if !dir.is_dir() {
        eprintln!("Error: '{}' is not a directory", dir.display());
        process::exit(1);
    }

    let manifest = match KernelManifest::from_dir(dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut failed = false;
    for (role, entry) in [("easu", &manifest.easu), ("rcas", &manifest.rcas), ("bilinear", &manifest.bilinear)] {
        let path = dir.join(&entry.file);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{role}: cannot read {}: {e}", path.display());
                failed = true;
                continue;
            }
        };

        match validate_wgsl(&source, &entry.entry_point) {
            Ok(validated) => {
                let [x, y, z] = validated.workgroup_size;
                println!("{role}: {} ({}) ok, workgroup {x}x{y}x{z}", path.display(), validated.entry_point);
            }
            Err(diagnostic) => {
                eprintln!("{role}: {} failed:\n{diagnostic}", path.display());
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
