//! The compilation driver.
//!
//! Owns the end-to-end pipeline: source expansion, loading, parsing,
//! staged analysis, then either header emission or backend codegen with a
//! parallel object-emission fan-out, linking, and the optional post-link
//! run.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::thread;

use tracing::{debug, info};

use crate::codegen::{self, header, linker, GenModule};
use crate::context::GlobalContext;
use crate::sema;
use crate::source::{self, SourceId};
use crate::syntax::dump::dump_unit;
use crate::syntax::lexer::lex_file;
use crate::syntax::parser::parse_file;
use crate::target::BuildTarget;

/// Result type for driver operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// A fatal compilation failure.
#[derive(Debug)]
pub enum CompileError {
    /// Bad configuration: invalid file names, empty input, failed thread
    /// spawn.
    Config(String),
    /// The shared scratch buffer capacity was exceeded.
    ScratchOverflow,
    /// I/O failure loading sources or writing artifacts.
    Io(io::Error),
    /// Front-end errors were reported; the count is the global error
    /// counter at the point the pipeline stopped.
    Analysis { errors: usize },
    /// Backend failure outside the worker I/O path.
    Codegen(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Config(msg) => write!(f, "{}", msg),
            CompileError::ScratchOverflow => {
                write!(
                    f,
                    "Scratch buffer size ({} chars) exceeded",
                    crate::context::MAX_STRING_BUFFER - 1
                )
            }
            CompileError::Io(err) => write!(f, "io error: {}", err),
            CompileError::Analysis { errors } => {
                write!(f, "compilation failed with {} error(s)", errors)
            }
            CompileError::Codegen(msg) => write!(f, "codegen error: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> Self {
        CompileError::Io(err)
    }
}

/// The compiler instance: one global context driven by one build target.
pub struct Compiler {
    pub ctx: GlobalContext,
    pub target: BuildTarget,
}

impl Compiler {
    pub fn new(target: BuildTarget) -> Self {
        let ctx = GlobalContext::new(target.lib_dir.clone(), target.symtab_size);
        Self { ctx, target }
    }

    /// Run the compilation selected by the build target.
    pub fn compile(&mut self) -> CompileResult<()> {
        let files = source::expand_source_names(&self.target.sources)?;
        if files.is_empty() {
            return Err(CompileError::Config("No files to compile.".to_string()));
        }
        if self.target.lex_only {
            return self.compile_lex_only(&files);
        }
        if self.target.parse_only {
            return self.compile_parse_only(&files);
        }
        self.compile_full(files)
    }

    /// Load a file, reporting the already-loaded flag.
    fn load(&mut self, path: &std::path::Path) -> CompileResult<(SourceId, bool)> {
        self.ctx.sources.load(path).map_err(|err| {
            CompileError::Config(format!("Failed to load '{}': {}", path.display(), err))
        })
    }

    /// `--lex-only`: print each file's token type names and stop.
    fn compile_lex_only(&mut self, files: &[PathBuf]) -> CompileResult<()> {
        for path in files {
            let (source_id, already_loaded) = self.load(path)?;
            if already_loaded {
                continue;
            }
            let name = self
                .ctx
                .sources
                .get(source_id)
                .map(|s| s.name())
                .unwrap_or_default();
            println!("# {}", name);
            let tokens = lex_file(&mut self.ctx, source_id);
            for token in tokens {
                print!("{} ", self.ctx.token_type(token).name());
            }
            println!();
        }
        Ok(())
    }

    /// `--parse-only`: parse each file and dump its AST.
    fn compile_parse_only(&mut self, files: &[PathBuf]) -> CompileResult<()> {
        for path in files {
            let (source_id, already_loaded) = self.load(path)?;
            if already_loaded {
                continue;
            }
            self.ctx.clear_errors();
            let (unit, ok) = parse_file(&mut self.ctx, source_id);
            if !ok {
                eprintln!("{}", self.ctx.diagnostics.render(&self.ctx.sources));
            }
            let value = dump_unit(&self.ctx, &unit);
            match serde_json::to_string_pretty(&value) {
                Ok(json) => println!("{}", json),
                Err(err) => eprintln!("AST dump failed: {}", err),
            }
        }
        Ok(())
    }

    /// Implicit standard-library sources, prepended when a library
    /// directory is configured.
    fn std_sources(&self) -> Vec<PathBuf> {
        let Some(lib_dir) = &self.ctx.lib_dir else {
            return Vec::new();
        };
        ["runtime", "builtin", "io", "mem", "array", "math"]
            .iter()
            .map(|name| lib_dir.join("std").join(format!("{}.c3", name)))
            .collect()
    }

    /// The full pipeline.
    fn compile_full(&mut self, files: Vec<PathBuf>) -> CompileResult<()> {
        self.ctx.clear_errors();

        let mut sources = self.std_sources();
        sources.extend(files);

        let mut units = Vec::new();
        for path in &sources {
            let (source_id, already_loaded) = self.load(path)?;
            if already_loaded {
                continue;
            }
            let (unit, ok) = parse_file(&mut self.ctx, source_id);
            if !ok {
                debug!(file = %path.display(), "parse failed");
            }
            units.push(unit);
        }
        if units.is_empty() {
            return Err(CompileError::Config(
                "No source files to compile.".to_string(),
            ));
        }

        let analysis = sema::analyze_all(&mut self.ctx);
        if let Err(err) = analysis {
            eprintln!("{}", self.ctx.diagnostics.render(&self.ctx.sources));
            return Err(err);
        }

        std::fs::create_dir_all(&self.target.obj_dir)?;

        if self.target.output_headers {
            let modules = self.ctx.module_list.clone();
            for module_id in modules {
                header::header_gen(&mut self.ctx, &self.target, module_id)?;
            }
            return Ok(());
        }

        codegen::setup(&self.target);

        let mut gen_modules = Vec::new();
        let modules = self.ctx.module_list.clone();
        for module_id in modules {
            if let Some(gen_module) = codegen::gen(&mut self.ctx, &self.target, module_id)? {
                gen_modules.push(gen_module);
            }
        }

        self.ctx.print_front_end_stats();
        // The backend has materialized everything it needs; the token-type
        // arena alone survives until link.
        self.ctx.free_front_end_arenas();

        let create_exe = self.target.wants_executable();

        if gen_modules.is_empty() {
            return Err(CompileError::Config("No output files found.".to_string()));
        }

        let obj_files = emit_objects(gen_modules, create_exe)?;

        let mut run_after_compile = self.target.run_after_compile;
        if create_exe {
            let objects: Vec<PathBuf> = obj_files.iter().flatten().cloned().collect();
            if self.target.arch_os.is_host_default() {
                linker::platform_linker(&self.target.name, &objects)?;
            } else if !linker::obj_format_linking_supported(self.target.arch_os.object_format())
                || !linker::linker(&self.target.name, &objects, self.target.arch_os)
            {
                println!("No linking is performed due to missing linker support.");
                run_after_compile = false;
            }
            if run_after_compile {
                linker::run_executable(&self.target.name)?;
            }
        }

        self.ctx.free_remaining_arenas();
        info!("compilation finished");
        Ok(())
    }
}

/// Parallel object emission: one worker per codegen context, joined in
/// index order so `obj_files[i]` always corresponds to `gen_modules[i]`
/// regardless of worker completion order.
pub fn emit_objects(
    gen_modules: Vec<GenModule>,
    create_exe: bool,
) -> CompileResult<Vec<Option<PathBuf>>> {
    let mut handles = Vec::with_capacity(gen_modules.len());
    for gen_module in gen_modules {
        let builder = thread::Builder::new().name(format!("codegen-{}", gen_module.module_name));
        let handle = builder
            .spawn(move || codegen::codegen(&gen_module))
            .map_err(|_| CompileError::Config("Failed to spawn compiler thread.".to_string()))?;
        handles.push(handle);
    }

    let mut obj_files = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle
            .join()
            .map_err(|_| CompileError::Codegen("codegen worker panicked".to_string()))?;
        let path = result?;
        // The front end rejects error-ful modules before codegen, so a
        // missing object is only legal when no executable is produced.
        assert!(
            path.is_some() || !create_exe,
            "backend produced no object while an executable is required"
        );
        obj_files.push(path);
    }
    Ok(obj_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetType;
    use std::fs;

    fn write_source(dir: &std::path::Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    fn target_in(dir: &std::path::Path) -> BuildTarget {
        BuildTarget {
            name: dir.join("out.bin").to_string_lossy().to_string(),
            obj_dir: dir.to_path_buf(),
            ..BuildTarget::default()
        }
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let mut compiler = Compiler::new(BuildTarget::default());
        let err = compiler.compile().unwrap_err();
        match err {
            CompileError::Config(msg) => assert_eq!(msg, "No files to compile."),
            other => panic!("expected config error, got {}", other),
        }
    }

    #[test]
    fn test_full_compile_links_in_module_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module first;\npublic fn int start() { return 1; }\n",
        );
        let b = write_source(
            dir.path(),
            "b.c3",
            "module second;\npublic fn int follow() { return 2; }\n",
        );

        let mut target = target_in(dir.path());
        target.sources = vec![a, b];
        target.kind = TargetType::Executable;

        let mut compiler = Compiler::new(target.clone());
        compiler.compile().unwrap();

        let image = fs::read_to_string(&target.name).unwrap();
        let first = image.find("module first").unwrap();
        let second = image.find("module second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_test_output_skips_link() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module only;\nfn int main() { return 0; }\n",
        );

        let mut target = target_in(dir.path());
        target.sources = vec![a];
        target.test_output = true;

        let mut compiler = Compiler::new(target.clone());
        compiler.compile().unwrap();

        assert!(dir.path().join("only.o").exists());
        assert!(!std::path::Path::new(&target.name).exists());
    }

    #[test]
    fn test_header_emission_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            write_source(dir.path(), "a.c3", "module one;\npublic fn void a() {}\n"),
            write_source(dir.path(), "b.c3", "module two;\npublic fn void b() {}\n"),
            write_source(dir.path(), "c.c3", "module three;\npublic fn void c() {}\n"),
        ];

        let mut target = target_in(dir.path());
        target.sources = sources;
        target.output_headers = true;

        let mut compiler = Compiler::new(target.clone());
        compiler.compile().unwrap();

        assert!(dir.path().join("one.h").exists());
        assert!(dir.path().join("two.h").exists());
        assert!(dir.path().join("three.h").exists());
        // Codegen never ran: no objects, no linked output.
        assert!(!dir.path().join("one.o").exists());
        assert!(!std::path::Path::new(&target.name).exists());
        // The front-end arenas are still live in header mode.
        assert!(!compiler.ctx.ast_arena.is_freed());
    }

    #[test]
    fn test_analysis_errors_fail_compile() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module bad;\nfn int f() { return missing_symbol; }\n",
        );

        let mut target = target_in(dir.path());
        target.sources = vec![a];

        let mut compiler = Compiler::new(target);
        let err = compiler.compile().unwrap_err();
        assert!(matches!(err, CompileError::Analysis { .. }));
    }

    #[test]
    fn test_duplicate_file_is_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module m;\nfn int main() { return 0; }\n",
        );

        let mut target = target_in(dir.path());
        // The same file through two spellings.
        target.sources = vec![a.clone(), a];
        target.test_output = true;

        let mut compiler = Compiler::new(target);
        compiler.compile().unwrap();
        // A re-parse would have reported a duplicate symbol.
        assert_eq!(compiler.ctx.diagnostics.error_count(), 0);
    }

    #[test]
    fn test_generic_only_input_produces_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module vec(Type);\nfn void push() {}\n",
        );

        let mut target = target_in(dir.path());
        target.sources = vec![a];

        let mut compiler = Compiler::new(target);
        // Generic modules are never scheduled, so there is zero analysis
        // work and nothing reaches the backend.
        let err = compiler.compile().unwrap_err();
        match err {
            CompileError::Config(msg) => assert_eq!(msg, "No output files found."),
            other => panic!("expected config error, got {}", other),
        }
        assert!(compiler.ctx.module_list.is_empty());
        assert_eq!(compiler.ctx.generic_module_list.len(), 1);
    }

    #[test]
    fn test_emit_objects_is_index_stable() {
        let dir = tempfile::tempdir().unwrap();
        let make = |i: usize, ops: usize| GenModule {
            module_name: format!("m{}", i),
            obj_path: dir.path().join(format!("m{}.o", i)),
            functions: vec![crate::codegen::GenFunction {
                name: "f".to_string(),
                mangled: format!("m{}_f", i),
                exported: false,
                // Vary the workload so completion order differs.
                ops: vec!["ret void".to_string(); ops],
            }],
            globals: Vec::new(),
        };

        let modules: Vec<GenModule> =
            (0..8).map(|i| make(i, if i % 2 == 0 { 5000 } else { 1 })).collect();
        let first = emit_objects(modules.clone(), true).unwrap();
        let second = emit_objects(modules, true).unwrap();

        for i in 0..8 {
            let path = first[i].as_ref().unwrap();
            assert!(path.ends_with(format!("m{}.o", i)));
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_wasm_target_skips_link_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(
            dir.path(),
            "a.c3",
            "module w;\nfn int main() { return 0; }\n",
        );

        let mut target = target_in(dir.path());
        target.sources = vec![a];
        target.arch_os = crate::target::ArchOsTarget::Wasm32;
        target.run_after_compile = true;

        let mut compiler = Compiler::new(target.clone());
        // Link is skipped (unsupported object format) and the run is
        // cancelled; the compile itself succeeds.
        compiler.compile().unwrap();
        assert!(!std::path::Path::new(&target.name).exists());
    }
}
