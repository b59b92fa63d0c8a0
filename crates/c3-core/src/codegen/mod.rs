//! The reference backend.
//!
//! Codegen is split in two phases across the arena-free boundary:
//! [`gen`] runs on the driver thread while the front-end arenas are live
//! and materializes an owned, handle-free [`GenModule`]; [`codegen`] runs
//! on a worker thread after the arenas are freed and only touches its own
//! context. Workers must never dereference front-end handles.

pub mod header;
pub mod linker;

use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::compiler::CompileError;
use crate::context::GlobalContext;
use crate::decl::{DeclKind, Visibility};
use crate::ids::{AstId, ExprId, ModuleId};
use crate::syntax::ast::{AstKind, BinaryOp, ExprKind, UnaryOp};
use crate::target::BuildTarget;

/// One-time backend setup, before any module is generated.
pub fn setup(target: &BuildTarget) {
    debug!(arch_os = ?target.arch_os, "backend setup");
}

/// A lowered function, detached from the arenas.
#[derive(Debug, Clone)]
pub struct GenFunction {
    pub name: String,
    pub mangled: String,
    pub exported: bool,
    pub ops: Vec<String>,
}

/// A lowered global variable.
#[derive(Debug, Clone)]
pub struct GenGlobal {
    pub name: String,
    pub mangled: String,
    pub exported: bool,
    pub init: Option<String>,
}

/// Module-level codegen context: everything object emission needs,
/// materialized as owned data. Safe to move to a worker thread.
#[derive(Debug, Clone)]
pub struct GenModule {
    pub module_name: String,
    pub obj_path: PathBuf,
    pub functions: Vec<GenFunction>,
    pub globals: Vec<GenGlobal>,
}

/// Mangle a symbol to its external name, deduplicated through the scratch
/// table. Dots in module paths become underscores, so `mod.a` and `mod_a`
/// could otherwise collide.
pub(crate) fn mangle(
    ctx: &mut GlobalContext,
    module_name: &str,
    symbol: &str,
) -> Result<String, CompileError> {
    ctx.scratch.clear();
    for part in module_name.split('.') {
        ctx.scratch.append(part)?;
        ctx.scratch.append_char('_')?;
    }
    ctx.scratch.append(symbol)?;
    let base = ctx.scratch.as_str().to_string();

    let mut candidate = base.clone();
    let mut counter = 1;
    loop {
        let key = ctx.intern(&candidate);
        if ctx.scratch_table.get(key).is_none() {
            ctx.scratch_table.set(key, key);
            return Ok(candidate);
        }
        candidate = format!("{}_{}", base, counter);
        counter += 1;
    }
}

/// Build the codegen context for one module, or `None` when the module
/// has nothing to emit.
pub fn gen(
    ctx: &mut GlobalContext,
    target: &BuildTarget,
    module_id: ModuleId,
) -> Result<Option<GenModule>, CompileError> {
    let module_name = ctx.str(ctx.module(module_id).name);
    let decls = ctx.module(module_id).decls.clone();

    let mut functions = Vec::new();
    let mut globals = Vec::new();

    for decl_id in decls {
        let decl = ctx.decl_arena.deref(decl_id);
        if decl.pruned {
            continue;
        }
        let name = ctx.str(decl.name);
        let exported = decl.visibility == Visibility::Public;
        match decl.kind.clone() {
            DeclKind::Func {
                body: Some(body), ..
            } => {
                let mut ops = Vec::new();
                lower_stmt(ctx, body, &mut ops, 0);
                let mangled = mangle(ctx, &module_name, &name)?;
                functions.push(GenFunction {
                    name,
                    mangled,
                    exported,
                    ops,
                });
            }
            DeclKind::Var {
                is_const: false,
                init,
                ..
            } => {
                let init = init.map(|e| lower_expr(ctx, e));
                let mangled = mangle(ctx, &module_name, &name)?;
                globals.push(GenGlobal {
                    name,
                    mangled,
                    exported,
                    init,
                });
            }
            _ => {}
        }
    }

    if functions.is_empty() && globals.is_empty() {
        debug!(module = %module_name, "nothing to emit");
        return Ok(None);
    }

    let obj_path = target
        .obj_dir
        .join(format!("{}.o", module_name.replace('.', "_")));
    debug!(module = %module_name, obj = %obj_path.display(), "module ir generated");
    Ok(Some(GenModule {
        module_name,
        obj_path,
        functions,
        globals,
    }))
}

/// Emit the object file for one codegen context.
///
/// Runs on a worker thread; `gen_module` is the worker's only input.
/// Returns the object path, or `None` when there is nothing to write
/// (never the case for this backend; the contract allows it for backends
/// that fold empty modules away here).
pub fn codegen(gen_module: &GenModule) -> io::Result<Option<PathBuf>> {
    let mut out = String::new();
    out.push_str(&format!("; c3 object: module {}\n", gen_module.module_name));
    for global in &gen_module.globals {
        let linkage = if global.exported { "global" } else { "local" };
        match &global.init {
            Some(init) => out.push_str(&format!(
                "data {} {} = {}\n",
                linkage, global.mangled, init
            )),
            None => out.push_str(&format!("data {} {} = zero\n", linkage, global.mangled)),
        }
    }
    for function in &gen_module.functions {
        let linkage = if function.exported { "global" } else { "local" };
        out.push_str(&format!("fn {} {}:\n", linkage, function.mangled));
        for op in &function.ops {
            out.push_str("  ");
            out.push_str(op);
            out.push('\n');
        }
    }
    std::fs::write(&gen_module.obj_path, out)?;
    Ok(Some(gen_module.obj_path.clone()))
}

fn lower_stmt(ctx: &GlobalContext, stmt_id: AstId, ops: &mut Vec<String>, depth: usize) {
    match &ctx.ast_arena.deref(stmt_id).kind {
        AstKind::Empty => {}
        AstKind::Compound { statements } => {
            for &stmt in statements {
                lower_stmt(ctx, stmt, ops, depth);
            }
        }
        AstKind::Return { value } => match value {
            Some(expr) => ops.push(format!("ret {}", lower_expr(ctx, *expr))),
            None => ops.push("ret void".to_string()),
        },
        AstKind::ExprStmt { expr } => {
            ops.push(format!("eval {}", lower_expr(ctx, *expr)));
        }
        AstKind::LocalVar { name, init, .. } => {
            let local = ctx.str(*name);
            match init {
                Some(expr) => ops.push(format!("local {} = {}", local, lower_expr(ctx, *expr))),
                None => ops.push(format!("local {} = zero", local)),
            }
        }
        AstKind::If {
            cond,
            then_body,
            else_body,
        } => {
            ops.push(format!("br {} L{}.then", lower_expr(ctx, *cond), depth));
            lower_stmt(ctx, *then_body, ops, depth + 1);
            if let Some(else_body) = else_body {
                ops.push(format!("L{}.else:", depth));
                lower_stmt(ctx, *else_body, ops, depth + 1);
            }
            ops.push(format!("L{}.end:", depth));
        }
        AstKind::While { cond, body } => {
            ops.push(format!("L{}.loop:", depth));
            ops.push(format!("br {} L{}.end", lower_expr(ctx, *cond), depth));
            lower_stmt(ctx, *body, ops, depth + 1);
            ops.push(format!("jmp L{}.loop", depth));
            ops.push(format!("L{}.end:", depth));
        }
    }
}

fn lower_expr(ctx: &GlobalContext, expr_id: ExprId) -> String {
    match &ctx.expr_arena.deref(expr_id).kind {
        ExprKind::Poisoned => "poison".to_string(),
        ExprKind::IntConst(v) => format!("const {}", v),
        ExprKind::RealConst(v) => format!("fconst {}", v),
        ExprKind::StrConst(s) => format!("str {:?}", s),
        ExprKind::Path { segments } => {
            let path: Vec<String> = segments.iter().map(|&n| ctx.str(n)).collect();
            format!("sym {}", path.join("."))
        }
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnaryOp::Neg => "neg",
                UnaryOp::Not => "not",
                UnaryOp::AddrOf => "addr",
            };
            format!("{} ({})", op, lower_expr(ctx, *operand))
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let op = binary_op_name(*op);
            format!(
                "{} ({}) ({})",
                op,
                lower_expr(ctx, *lhs),
                lower_expr(ctx, *rhs)
            )
        }
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|&a| lower_expr(ctx, a)).collect();
            format!("call ({}) [{}]", lower_expr(ctx, *callee), args.join(", "))
        }
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Div => "div",
        Mod => "mod",
        Eq => "cmpeq",
        Ne => "cmpne",
        Lt => "cmplt",
        Gt => "cmpgt",
        Le => "cmple",
        Ge => "cmpge",
        And => "and",
        Or => "or",
        BitAnd => "band",
        BitOr => "bor",
        BitXor => "bxor",
        Assign => "store",
    }
}
