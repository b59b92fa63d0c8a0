//! The staged analysis scheduler.
//!
//! Each module progresses monotonically through the fixed pass pipeline.
//! The driver raises the target stage one step at a time across the whole
//! module list, so every module completes stage *k* before any module
//! begins stage *k+1*; cross-module references needed by pass *k+1* are
//! guaranteed to exist.

pub mod const_eval;
pub mod passes;

use tracing::debug;

use crate::compiler::CompileError;
use crate::context::GlobalContext;
use crate::ids::ModuleId;
use crate::module::AnalysisStage;

/// Advance one module up to `target_stage`, running the pass matching each
/// newly entered stage.
///
/// Stops without advancing further as soon as the global error count is
/// nonzero; the module is left at the failing stage and is not re-entered
/// in this compilation.
pub fn analyze_stage(ctx: &mut GlobalContext, module_id: ModuleId, target_stage: AnalysisStage) {
    debug_assert!(ctx.module(module_id).stage <= target_stage);
    while ctx.module(module_id).stage < target_stage {
        let stage = ctx.module_mut(module_id).advance_stage();
        debug!(
            module = %ctx.str(ctx.module(module_id).name),
            stage = stage.name(),
            "analysis pass"
        );
        match stage {
            AnalysisStage::NotBegun => unreachable!("NotBegun is never entered"),
            AnalysisStage::Imports => passes::process_imports(ctx, module_id),
            AnalysisStage::RegisterGlobals => passes::register_globals(ctx, module_id),
            AnalysisStage::ConditionalCompilation => passes::conditional_compilation(ctx, module_id),
            AnalysisStage::Decls => passes::resolve_decls(ctx, module_id),
            AnalysisStage::CtAssert => passes::check_ct_asserts(ctx, module_id),
            AnalysisStage::Functions => passes::check_functions(ctx, module_id),
        }
        if ctx.diagnostics.has_errors() {
            return;
        }
    }
}

/// Run every non-generic module (in parse order) up to `target_stage`.
///
/// Errors from different modules are batched within the sweep; the whole
/// compilation fails only after the sweep completes.
pub fn analyze_to_stage(
    ctx: &mut GlobalContext,
    target_stage: AnalysisStage,
) -> Result<(), CompileError> {
    let modules = ctx.module_list.clone();
    for module_id in modules {
        analyze_stage(ctx, module_id, target_stage);
    }
    if ctx.diagnostics.has_errors() {
        return Err(CompileError::Analysis {
            errors: ctx.diagnostics.error_count(),
        });
    }
    Ok(())
}

/// Run the full pipeline: every stage, in order, over every module.
pub fn analyze_all(ctx: &mut GlobalContext) -> Result<(), CompileError> {
    for target_stage in AnalysisStage::all() {
        analyze_to_stage(ctx, target_stage)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::AnalysisStage;
    use crate::symtab::GlobalSymbol;
    use crate::syntax::parser::parse_file;

    fn ctx_with_sources(sources: &[&str]) -> GlobalContext {
        let mut ctx = GlobalContext::new(None, 1024);
        for source in sources {
            let id = ctx.sources.add_inline(*source);
            let (_, _ok) = parse_file(&mut ctx, id);
        }
        ctx
    }

    #[test]
    fn test_full_analysis_of_clean_input() {
        let mut ctx = ctx_with_sources(&[
            "module mod.a;\npublic fn int answer() { return 42; }\n",
            "module mod.b;\nimport mod.a;\nfn int use_it() { return answer(); }\n",
        ]);
        analyze_all(&mut ctx).unwrap();
        for &m in &ctx.module_list {
            assert_eq!(ctx.module(m).stage, AnalysisStage::LAST);
        }
    }

    #[test]
    fn test_stage_sweep_is_batched() {
        // All modules reach stage k before any reaches k+1.
        let mut ctx = ctx_with_sources(&[
            "module a;\nfn void f() {}\n",
            "module b;\nfn void g() {}\n",
            "module c;\nfn void h() {}\n",
        ]);
        for target in AnalysisStage::all() {
            analyze_to_stage(&mut ctx, target).unwrap();
            for &m in &ctx.module_list {
                assert_eq!(ctx.module(m).stage, target);
            }
        }
    }

    #[test]
    fn test_stage_is_monotonic_across_sweeps() {
        let mut ctx = ctx_with_sources(&["module a;\nfn void f() {}\n"]);
        let module = ctx.module_list[0];
        let mut last = ctx.module(module).stage;
        for target in AnalysisStage::all() {
            let _ = analyze_to_stage(&mut ctx, target);
            let stage = ctx.module(module).stage;
            assert!(stage >= last);
            last = stage;
        }
    }

    #[test]
    fn test_unknown_import_halts_after_sweep() {
        let mut ctx = ctx_with_sources(&[
            "module a;\nimport no.such.module;\n",
            "module b;\nfn void g() {}\n",
        ]);
        let err = analyze_to_stage(&mut ctx, AnalysisStage::Imports).unwrap_err();
        match err {
            CompileError::Analysis { errors } => assert!(errors > 0),
            other => panic!("expected analysis failure, got {}", other),
        }
        // The failing module stopped at Imports; the sweep still visited
        // the other module.
        assert_eq!(ctx.module(ctx.module_list[0]).stage, AnalysisStage::Imports);
        assert_eq!(ctx.module(ctx.module_list[1]).stage, AnalysisStage::Imports);
    }

    #[test]
    fn test_duplicate_public_symbols_poison_global_table() {
        let mut ctx = ctx_with_sources(&[
            "module mod.a;\npublic fn int foo() { return 1; }\n",
            "module mod.b;\npublic fn int foo() { return 2; }\n",
        ]);
        analyze_to_stage(&mut ctx, AnalysisStage::RegisterGlobals).unwrap();

        let foo = ctx.intern("foo");
        assert_eq!(ctx.find_symbol(foo), Some(GlobalSymbol::Poisoned));

        let mod_a = ctx.intern("mod.a");
        let mod_b = ctx.intern("mod.b");
        let in_a = ctx.find_qualified_symbol(mod_a, foo);
        let in_b = ctx.find_qualified_symbol(mod_b, foo);
        assert!(matches!(in_a, Some(GlobalSymbol::Decl(_))));
        assert!(matches!(in_b, Some(GlobalSymbol::Decl(_))));
        assert_ne!(in_a, in_b);
    }

    #[test]
    fn test_ambiguous_use_site_reports_error() {
        let mut ctx = ctx_with_sources(&[
            "module mod.a;\npublic fn int foo() { return 1; }\n",
            "module mod.b;\npublic fn int foo() { return 2; }\n",
            "module mod.c;\nfn int call_foo() { return foo(); }\n",
        ]);
        let err = analyze_all(&mut ctx).unwrap_err();
        assert!(matches!(err, CompileError::Analysis { .. }));
        let rendered = ctx.diagnostics.render(&ctx.sources);
        assert!(rendered.contains("ambiguous"), "got: {}", rendered);
    }

    #[test]
    fn test_qualified_use_of_duplicate_symbol_is_fine() {
        let mut ctx = ctx_with_sources(&[
            "module mod.a;\npublic fn int foo() { return 1; }\n",
            "module mod.b;\npublic fn int foo() { return 2; }\n",
            "module mod.c;\nfn int call_foo() { return mod.a.foo(); }\n",
        ]);
        analyze_all(&mut ctx).unwrap();
    }

    #[test]
    fn test_conditional_compilation_prunes() {
        let mut ctx = ctx_with_sources(&[
            // BIG_ENDIAN is 0 on little-endian hosts; NO_SUCH_GATE is absent.
            "module a;\n@when(NO_SUCH_GATE) fn void dropped() {}\nfn void kept() {}\n",
        ]);
        analyze_all(&mut ctx).unwrap();
        let module = ctx.module(ctx.module_list[0]);
        let pruned: Vec<bool> = module
            .decls
            .iter()
            .map(|&d| ctx.decl_arena.deref(d).pruned)
            .collect();
        assert_eq!(pruned, vec![true, false]);
    }

    #[test]
    fn test_conditional_compilation_keeps_when_nonzero() {
        let mut ctx = ctx_with_sources(&[
            "module a;\n@when(PTR_SIZE) fn void kept() {}\n",
        ]);
        analyze_all(&mut ctx).unwrap();
        let module = ctx.module(ctx.module_list[0]);
        assert!(!ctx.decl_arena.deref(module.decls[0]).pruned);
    }

    #[test]
    fn test_ct_assert_failure() {
        let mut ctx = ctx_with_sources(&["module a;\n$assert(1 == 2, \"broken\");\n"]);
        let err = analyze_all(&mut ctx).unwrap_err();
        assert!(matches!(err, CompileError::Analysis { .. }));
        let rendered = ctx.diagnostics.render(&ctx.sources);
        assert!(rendered.contains("assertion failed"));
        assert!(rendered.contains("broken"));
        // The module halted at the CtAssert stage.
        assert_eq!(ctx.module(ctx.module_list[0]).stage, AnalysisStage::CtAssert);
    }

    #[test]
    fn test_ct_assert_success() {
        let mut ctx = ctx_with_sources(&["module a;\n$assert(PTR_SIZE > 0);\n"]);
        analyze_all(&mut ctx).unwrap();
    }

    #[test]
    fn test_unknown_symbol_in_function_body() {
        let mut ctx = ctx_with_sources(&["module a;\nfn int f() { return missing; }\n"]);
        let err = analyze_all(&mut ctx).unwrap_err();
        assert!(matches!(err, CompileError::Analysis { .. }));
        let rendered = ctx.diagnostics.render(&ctx.sources);
        assert!(rendered.contains("unknown symbol 'missing'"));
    }

    #[test]
    fn test_locals_shadow_globals() {
        let mut ctx = ctx_with_sources(&[
            "module a;\npublic const int VALUE = 3;\nfn int f(int value) { int other = 1; return value + other; }\n",
        ]);
        analyze_all(&mut ctx).unwrap();
    }

    #[test]
    fn test_generic_modules_are_not_scheduled() {
        let mut ctx = ctx_with_sources(&[
            "module vec(Type);\nfn void push() { return undefined_symbol; }\n",
            "module user;\nfn void f() {}\n",
        ]);
        // The generic module's body is never analyzed, so its undefined
        // symbol is never reported.
        analyze_all(&mut ctx).unwrap();
        let generic = ctx.generic_module_list[0];
        assert_eq!(ctx.module(generic).stage, AnalysisStage::NotBegun);
    }

    #[test]
    fn test_typedef_resolution() {
        let mut ctx = ctx_with_sources(&[
            "module a;\ntypedef handle = int;\nfn handle open() { return 0; }\n",
        ]);
        analyze_all(&mut ctx).unwrap();
    }
}
