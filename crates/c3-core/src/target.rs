//! Build-target configuration.
//!
//! A [`BuildTarget`] is assembled by the CLI and owned by the driver for
//! the whole compilation. It fixes what is produced (executable, objects,
//! headers), for which architecture/OS tuple, and the post-compile
//! behavior.

use std::path::PathBuf;

/// What kind of artifact the compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetType {
    #[default]
    Executable,
    StaticLib,
    ObjectFiles,
    Test,
}

/// Architecture/OS tuple. `Default` means the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchOsTarget {
    #[default]
    Default,
    X64Linux,
    X64Darwin,
    X64Windows,
    Aarch64Linux,
    Aarch64Darwin,
    Wasm32,
}

/// Object-file container format for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    Elf,
    MachO,
    Coff,
    Wasm,
}

impl ArchOsTarget {
    pub fn is_host_default(self) -> bool {
        self == ArchOsTarget::Default
    }

    pub fn object_format(self) -> ObjectFormat {
        match self {
            ArchOsTarget::Default => host_object_format(),
            ArchOsTarget::X64Linux | ArchOsTarget::Aarch64Linux => ObjectFormat::Elf,
            ArchOsTarget::X64Darwin | ArchOsTarget::Aarch64Darwin => ObjectFormat::MachO,
            ArchOsTarget::X64Windows => ObjectFormat::Coff,
            ArchOsTarget::Wasm32 => ObjectFormat::Wasm,
        }
    }
}

fn host_object_format() -> ObjectFormat {
    if cfg!(target_os = "macos") {
        ObjectFormat::MachO
    } else if cfg!(target_os = "windows") {
        ObjectFormat::Coff
    } else {
        ObjectFormat::Elf
    }
}

/// The full configuration of one compilation.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub kind: TargetType,
    /// Output name for the linked artifact.
    pub name: String,
    /// Source names before wildcard expansion.
    pub sources: Vec<String>,
    pub arch_os: ArchOsTarget,
    /// Emit header files per module instead of running codegen.
    pub output_headers: bool,
    /// Compile only: skip the link and run steps even for executables.
    pub test_output: bool,
    /// Execute `./<name>` after a successful link.
    pub run_after_compile: bool,
    /// Print lexical tokens and stop.
    pub lex_only: bool,
    /// Parse, dump the AST and stop.
    pub parse_only: bool,
    /// Standard-library directory; implicit std sources are prepended
    /// when set.
    pub lib_dir: Option<PathBuf>,
    /// Directory for object files and headers.
    pub obj_dir: PathBuf,
    /// Identifier symbol-table capacity; 0 means the default.
    pub symtab_size: usize,
}

impl Default for BuildTarget {
    fn default() -> Self {
        Self {
            kind: TargetType::Executable,
            name: "foo.out".to_string(),
            sources: Vec::new(),
            arch_os: ArchOsTarget::Default,
            output_headers: false,
            test_output: false,
            run_after_compile: false,
            lex_only: false,
            parse_only: false,
            lib_dir: None,
            obj_dir: PathBuf::from("."),
            symtab_size: 0,
        }
    }
}

impl BuildTarget {
    /// Whether this compilation should end in a linked executable.
    pub fn wants_executable(&self) -> bool {
        !self.test_output
            && matches!(self.kind, TargetType::Executable | TargetType::Test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_executable() {
        let mut target = BuildTarget::default();
        assert!(target.wants_executable());

        target.test_output = true;
        assert!(!target.wants_executable());

        target.test_output = false;
        target.kind = TargetType::ObjectFiles;
        assert!(!target.wants_executable());

        target.kind = TargetType::Test;
        assert!(target.wants_executable());
    }

    #[test]
    fn test_object_formats() {
        assert_eq!(ArchOsTarget::X64Linux.object_format(), ObjectFormat::Elf);
        assert_eq!(ArchOsTarget::Wasm32.object_format(), ObjectFormat::Wasm);
        assert!(ArchOsTarget::Default.is_host_default());
        assert!(!ArchOsTarget::Wasm32.is_host_default());
    }
}
