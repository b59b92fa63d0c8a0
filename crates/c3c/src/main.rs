//! C3 compiler command line driver.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use c3_core::{ArchOsTarget, BuildTarget, Compiler, TargetType};

#[derive(Parser)]
#[command(name = "c3c")]
#[command(author, version, about = "C3 Compiler", long_about = None)]
struct Cli {
    /// Source files: .c3 paths, `dir/*` or recursive `dir/**` wildcards
    #[arg(required = true)]
    files: Vec<String>,

    /// Print lexical tokens for each source and stop
    #[arg(long)]
    lex_only: bool,

    /// Parse each source, dump the AST and stop
    #[arg(long)]
    parse_only: bool,

    /// Emit header files per module instead of objects
    #[arg(long)]
    output_headers: bool,

    /// Compile only; skip linking and running even for executables
    #[arg(long)]
    test_output: bool,

    /// Execute the produced binary after a successful link
    #[arg(long)]
    run: bool,

    /// Output name for the linked artifact
    #[arg(short, long, default_value = "foo.out")]
    output: String,

    /// What to build
    #[arg(long, value_enum, default_value = "executable")]
    kind: BuildKind,

    /// Target architecture/OS tuple
    #[arg(long, value_enum, default_value = "default")]
    target: TargetArg,

    /// Standard library directory
    #[arg(long)]
    lib_dir: Option<PathBuf>,

    /// Directory for object files and headers
    #[arg(long, default_value = ".")]
    obj_dir: PathBuf,

    /// Identifier symbol table capacity
    #[arg(long, default_value_t = 0)]
    symtab: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildKind {
    /// Linked executable
    Executable,
    /// Static library objects
    StaticLib,
    /// Object files only
    ObjectFiles,
    /// Test runner executable
    Test,
}

impl From<BuildKind> for TargetType {
    fn from(kind: BuildKind) -> Self {
        match kind {
            BuildKind::Executable => TargetType::Executable,
            BuildKind::StaticLib => TargetType::StaticLib,
            BuildKind::ObjectFiles => TargetType::ObjectFiles,
            BuildKind::Test => TargetType::Test,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    /// Host platform
    Default,
    X64Linux,
    X64Darwin,
    X64Windows,
    Aarch64Linux,
    Aarch64Darwin,
    Wasm32,
}

impl From<TargetArg> for ArchOsTarget {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Default => ArchOsTarget::Default,
            TargetArg::X64Linux => ArchOsTarget::X64Linux,
            TargetArg::X64Darwin => ArchOsTarget::X64Darwin,
            TargetArg::X64Windows => ArchOsTarget::X64Windows,
            TargetArg::Aarch64Linux => ArchOsTarget::Aarch64Linux,
            TargetArg::Aarch64Darwin => ArchOsTarget::Aarch64Darwin,
            TargetArg::Wasm32 => ArchOsTarget::Wasm32,
        }
    }
}

fn build_target(cli: &Cli) -> BuildTarget {
    BuildTarget {
        kind: cli.kind.into(),
        name: cli.output.clone(),
        sources: cli.files.clone(),
        arch_os: cli.target.into(),
        output_headers: cli.output_headers,
        test_output: cli.test_output,
        run_after_compile: cli.run,
        lex_only: cli.lex_only,
        parse_only: cli.parse_only,
        lib_dir: cli.lib_dir.clone(),
        obj_dir: cli.obj_dir.clone(),
        symtab_size: cli.symtab,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let target = build_target(cli);
    let mut compiler = Compiler::new(target);
    compiler
        .compile()
        .with_context(|| format!("Failed to compile target '{}'", cli.output))?;
    Ok(())
}
