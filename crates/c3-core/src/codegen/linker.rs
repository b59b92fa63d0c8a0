//! The link step and post-compile execution.
//!
//! The reference backend's objects are text listings, so linking is a
//! concatenation of the per-module sections into one image with a small
//! manifest header. The platform linker handles the host default target;
//! the generic linker covers other targets whose object format supports
//! linking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::compiler::CompileError;
use crate::target::{ArchOsTarget, ObjectFormat};

/// Whether the generic linker can handle this object format.
pub fn obj_format_linking_supported(format: ObjectFormat) -> bool {
    !matches!(format, ObjectFormat::Wasm)
}

/// Link for the host default target.
pub fn platform_linker(output_name: &str, obj_files: &[PathBuf]) -> Result<(), CompileError> {
    link_image(output_name, obj_files, "host").map_err(CompileError::Io)?;
    mark_executable(Path::new(output_name)).map_err(CompileError::Io)?;
    info!(output = output_name, objects = obj_files.len(), "linked");
    Ok(())
}

/// Link for a non-default target. Returns `false` on failure; the driver
/// then skips linking with a notice instead of aborting.
pub fn linker(output_name: &str, obj_files: &[PathBuf], arch_os: ArchOsTarget) -> bool {
    match link_image(output_name, obj_files, &format!("{:?}", arch_os)) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "generic link failed");
            false
        }
    }
}

fn link_image(output_name: &str, obj_files: &[PathBuf], target: &str) -> io::Result<()> {
    let mut image = String::new();
    image.push_str(&format!(
        "; c3 linked image: {} ({} objects, target {})\n",
        output_name,
        obj_files.len(),
        target
    ));
    for obj in obj_files {
        image.push_str(&format!("; section from {}\n", obj.display()));
        image.push_str(&fs::read_to_string(obj)?);
    }
    fs::write(output_name, image)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Execute the produced binary as a child process.
pub fn run_executable(output_name: &str) -> Result<(), CompileError> {
    let path = format!("./{}", output_name);
    info!(binary = %path, "running");
    match Command::new(&path).status() {
        Ok(status) => {
            if !status.success() {
                eprintln!("Program exited with {}", status);
            }
            Ok(())
        }
        Err(err) => Err(CompileError::Io(err)),
    }
}
