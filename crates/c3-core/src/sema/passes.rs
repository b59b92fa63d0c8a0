//! The semantic analysis passes.
//!
//! One function per analysis stage, invoked by the scheduler in stage
//! order. Passes communicate failure exclusively through the global
//! diagnostics; they never abort the sweep themselves.

use crate::context::GlobalContext;
use crate::decl::{DeclKind, ResolveStatus, Visibility};
use crate::ids::{AstId, DeclId, ExprId, ModuleId, TypeInfoId};
use crate::interner::Name;
use crate::sema::const_eval::{self, ConstEvalError};
use crate::symtab::GlobalSymbol;
use crate::syntax::ast::{AstKind, ExprKind, ResolvedType, TypeInfoKind};

/// Stage 1: resolve `import` declarations to concrete modules.
pub fn process_imports(ctx: &mut GlobalContext, module_id: ModuleId) {
    let imports = ctx.module(module_id).imports.clone();
    for decl_id in imports {
        let (path_name, loc) = {
            let decl = ctx.decl_arena.deref(decl_id);
            match &decl.kind {
                DeclKind::Import { path_name, .. } => (*path_name, decl.loc),
                _ => continue,
            }
        };
        match ctx.find_module(path_name) {
            Some(target) => {
                let decl = ctx.decl_arena.deref_mut(decl_id);
                if let DeclKind::Import { resolved, .. } = &mut decl.kind {
                    *resolved = Some(target);
                }
                decl.resolve_status = ResolveStatus::Done;
            }
            None => {
                let span = ctx.token_span(loc);
                let name = ctx.str(path_name);
                ctx.diagnostics
                    .error(span, format!("import of unknown module '{}'", name));
                ctx.decl_arena.deref_mut(decl_id).resolve_status = ResolveStatus::Poisoned;
            }
        }
    }
}

/// Stage 2: populate module-local symbol tables (names only) and make
/// public declarations globally visible.
pub fn register_globals(ctx: &mut GlobalContext, module_id: ModuleId) {
    let decls = ctx.module(module_id).decls.clone();
    for decl_id in decls {
        let (name, visibility, loc, is_symbol) = {
            let decl = ctx.decl_arena.deref(decl_id);
            (decl.name, decl.visibility, decl.loc, decl.is_symbol())
        };
        if !is_symbol || name.is_empty() {
            continue;
        }

        if ctx.module(module_id).symbols.get(name).is_some() {
            let span = ctx.token_span(loc);
            let symbol = ctx.str(name);
            let module = ctx.str(ctx.module(module_id).name);
            ctx.diagnostics.error(
                span,
                format!("duplicate symbol '{}' in module '{}'", symbol, module),
            );
            continue;
        }
        ctx.module_mut(module_id).symbols.set(name, decl_id);

        if visibility == Visibility::Public {
            ctx.module_mut(module_id).public_symbols.set(name, decl_id);
            ctx.register_public_symbol(decl_id);
        }
    }
}

/// Stage 3: evaluate `@when` gates and prune declarations whose gate
/// constant is absent or zero.
pub fn conditional_compilation(ctx: &mut GlobalContext, module_id: ModuleId) {
    let decls = ctx.module(module_id).decls.clone();
    for decl_id in decls {
        let (gate, loc) = {
            let decl = ctx.decl_arena.deref(decl_id);
            match decl.when_gate {
                Some(gate) => (gate, decl.loc),
                None => continue,
            }
        };
        let keep = match ctx.find_symbol(gate) {
            Some(GlobalSymbol::Poisoned) => {
                let span = ctx.token_span(loc);
                let name = ctx.str(gate);
                ctx.diagnostics.error(
                    span,
                    format!(
                        "'{}' is ambiguous, it has more than one public definition",
                        name
                    ),
                );
                false
            }
            Some(GlobalSymbol::Decl(gate_decl)) => {
                ctx.decl_arena.deref(gate_decl).const_value().unwrap_or(0) != 0
            }
            None => false,
        };
        if !keep {
            ctx.decl_arena.deref_mut(decl_id).pruned = true;
        }
    }
}

/// Stage 4: resolve declaration types, constants and signatures.
pub fn resolve_decls(ctx: &mut GlobalContext, module_id: ModuleId) {
    let decls = ctx.module(module_id).decls.clone();
    for decl_id in decls {
        if ctx.decl_arena.deref(decl_id).pruned {
            continue;
        }
        if ctx.decl_arena.deref(decl_id).resolve_status == ResolveStatus::Done {
            continue;
        }
        ctx.decl_arena.deref_mut(decl_id).resolve_status = ResolveStatus::InProgress;
        let ok = resolve_decl(ctx, module_id, decl_id);
        ctx.decl_arena.deref_mut(decl_id).resolve_status = if ok {
            ResolveStatus::Done
        } else {
            ResolveStatus::Poisoned
        };
    }
}

fn resolve_decl(ctx: &mut GlobalContext, module_id: ModuleId, decl_id: DeclId) -> bool {
    let kind = ctx.decl_arena.deref(decl_id).kind.clone();
    match kind {
        DeclKind::Var {
            is_const,
            type_info,
            init,
            ..
        } => {
            let mut ok = match type_info {
                Some(t) => resolve_type(ctx, module_id, t),
                None => true,
            };
            if is_const {
                match init {
                    Some(expr) => match const_eval::eval(ctx, module_id, expr) {
                        Ok(value) => {
                            if let DeclKind::Var { const_value, .. } =
                                &mut ctx.decl_arena.deref_mut(decl_id).kind
                            {
                                *const_value = Some(value);
                            }
                        }
                        Err(err) => {
                            report_const_error(ctx, &err);
                            ok = false;
                        }
                    },
                    None => {
                        let loc = ctx.decl_arena.deref(decl_id).loc;
                        let span = ctx.token_span(loc);
                        ctx.diagnostics.error(span, "constant has no initializer");
                        ok = false;
                    }
                }
            }
            ok
        }
        DeclKind::Func {
            ret_type, params, ..
        } => {
            let mut ok = match ret_type {
                Some(t) => resolve_type(ctx, module_id, t),
                None => true,
            };
            for param in &params {
                ok &= resolve_type(ctx, module_id, param.type_info);
            }
            ok
        }
        DeclKind::TypeDef { underlying } => resolve_type(ctx, module_id, underlying),
        DeclKind::Import { .. } | DeclKind::CtAssert { .. } | DeclKind::None => true,
    }
}

fn resolve_type(ctx: &mut GlobalContext, module_id: ModuleId, type_id: TypeInfoId) -> bool {
    let kind = ctx.type_info_arena.deref(type_id).kind.clone();
    let resolved = match kind {
        TypeInfoKind::Builtin(builtin) => ResolvedType::Builtin(builtin),
        TypeInfoKind::Pointer(inner) => {
            if !resolve_type(ctx, module_id, inner) {
                ResolvedType::Poisoned
            } else {
                // Pointers resolve through their pointee.
                ctx.type_info_arena.deref(inner).resolved
            }
        }
        TypeInfoKind::Named(name) => {
            let local = ctx.module(module_id).symbols.get(name).copied();
            let candidate = match local {
                Some(decl_id) => Some(GlobalSymbol::Decl(decl_id)),
                None => ctx.find_symbol(name),
            };
            match candidate {
                Some(GlobalSymbol::Decl(decl_id)) if ctx.decl_arena.deref(decl_id).is_type() => {
                    ResolvedType::Decl(decl_id)
                }
                Some(GlobalSymbol::Poisoned) => {
                    let loc = ctx.type_info_arena.deref(type_id).loc;
                    let span = ctx.token_span(loc);
                    let type_name = ctx.str(name);
                    ctx.diagnostics.error(
                        span,
                        format!(
                            "'{}' is ambiguous, it has more than one public definition",
                            type_name
                        ),
                    );
                    ResolvedType::Poisoned
                }
                _ => {
                    let loc = ctx.type_info_arena.deref(type_id).loc;
                    let span = ctx.token_span(loc);
                    let type_name = ctx.str(name);
                    ctx.diagnostics
                        .error(span, format!("unknown type '{}'", type_name));
                    ResolvedType::Poisoned
                }
            }
        }
        TypeInfoKind::Unparsed => ResolvedType::Poisoned,
    };
    ctx.type_info_arena.deref_mut(type_id).resolved = resolved;
    resolved != ResolvedType::Poisoned
}

/// Stage 5: evaluate compile-time assertions.
pub fn check_ct_asserts(ctx: &mut GlobalContext, module_id: ModuleId) {
    let decls = ctx.module(module_id).decls.clone();
    for decl_id in decls {
        let (expr, message, loc) = {
            let decl = ctx.decl_arena.deref(decl_id);
            if decl.pruned {
                continue;
            }
            match &decl.kind {
                DeclKind::CtAssert { expr, message } => (*expr, message.clone(), decl.loc),
                _ => continue,
            }
        };
        match const_eval::eval(ctx, module_id, expr) {
            Ok(value) if value != 0 => {}
            Ok(_) => {
                let span = ctx.token_span(loc);
                let text = match message {
                    Some(msg) => format!("compile-time assertion failed: {}", msg),
                    None => "compile-time assertion failed".to_string(),
                };
                ctx.diagnostics.error(span, text);
            }
            Err(err) => report_const_error(ctx, &err),
        }
    }
}

/// Stage 6: type-check function bodies. Resolves every identifier use
/// against locals, the module namespace, and the global table; a poisoned
/// global entry reports an ambiguity at the use site.
pub fn check_functions(ctx: &mut GlobalContext, module_id: ModuleId) {
    let decls = ctx.module(module_id).decls.clone();
    for decl_id in decls {
        let (body, params) = {
            let decl = ctx.decl_arena.deref(decl_id);
            if decl.pruned || decl.resolve_status == ResolveStatus::Poisoned {
                continue;
            }
            match &decl.kind {
                DeclKind::Func {
                    body: Some(body),
                    params,
                    ..
                } => (*body, params.iter().map(|p| p.name).collect::<Vec<_>>()),
                _ => continue,
            }
        };
        let mut scope = Scope::new(params);
        check_stmt(ctx, module_id, body, &mut scope);
    }
}

struct Scope {
    frames: Vec<Vec<Name>>,
}

impl Scope {
    fn new(params: Vec<Name>) -> Self {
        Self {
            frames: vec![params],
        }
    }

    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn declare(&mut self, name: Name) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(name);
        }
    }

    fn contains(&self, name: Name) -> bool {
        self.frames.iter().any(|f| f.contains(&name))
    }
}

fn check_stmt(ctx: &mut GlobalContext, module_id: ModuleId, stmt_id: AstId, scope: &mut Scope) {
    let kind = ctx.ast_arena.deref(stmt_id).kind.clone();
    match kind {
        AstKind::Empty => {}
        AstKind::Compound { statements } => {
            scope.push();
            for stmt in statements {
                check_stmt(ctx, module_id, stmt, scope);
            }
            scope.pop();
        }
        AstKind::Return { value } => {
            if let Some(expr) = value {
                check_expr(ctx, module_id, expr, scope);
            }
        }
        AstKind::ExprStmt { expr } => check_expr(ctx, module_id, expr, scope),
        AstKind::LocalVar {
            name,
            type_info,
            init,
        } => {
            resolve_type(ctx, module_id, type_info);
            if let Some(expr) = init {
                check_expr(ctx, module_id, expr, scope);
            }
            scope.declare(name);
        }
        AstKind::If {
            cond,
            then_body,
            else_body,
        } => {
            check_expr(ctx, module_id, cond, scope);
            check_stmt(ctx, module_id, then_body, scope);
            if let Some(else_body) = else_body {
                check_stmt(ctx, module_id, else_body, scope);
            }
        }
        AstKind::While { cond, body } => {
            check_expr(ctx, module_id, cond, scope);
            check_stmt(ctx, module_id, body, scope);
        }
    }
}

fn check_expr(ctx: &mut GlobalContext, module_id: ModuleId, expr_id: ExprId, scope: &Scope) {
    let kind = ctx.expr_arena.deref(expr_id).kind.clone();
    let loc = ctx.expr_arena.deref(expr_id).loc;
    match kind {
        ExprKind::Path { segments } => {
            // Locals and parameters shadow module and global symbols.
            if let [single] = segments[..] {
                if scope.contains(single) {
                    return;
                }
            }
            resolve_use(ctx, module_id, &segments, loc);
        }
        ExprKind::Unary { operand, .. } => check_expr(ctx, module_id, operand, scope),
        ExprKind::Binary { lhs, rhs, .. } => {
            check_expr(ctx, module_id, lhs, scope);
            check_expr(ctx, module_id, rhs, scope);
        }
        ExprKind::Call { callee, args } => {
            check_expr(ctx, module_id, callee, scope);
            for arg in args {
                check_expr(ctx, module_id, arg, scope);
            }
        }
        ExprKind::Poisoned
        | ExprKind::IntConst(_)
        | ExprKind::RealConst(_)
        | ExprKind::StrConst(_) => {}
    }
}

fn resolve_use(
    ctx: &mut GlobalContext,
    module_id: ModuleId,
    segments: &[Name],
    loc: crate::ids::TokenId,
) {
    match segments {
        [single] => {
            if let Some(&decl_id) = ctx.module(module_id).symbols.get(*single) {
                if !ctx.decl_arena.deref(decl_id).pruned {
                    return;
                }
            }
            match ctx.find_symbol(*single) {
                Some(GlobalSymbol::Decl(decl_id))
                    if !ctx.decl_arena.deref(decl_id).pruned => {}
                Some(GlobalSymbol::Poisoned) => {
                    let span = ctx.token_span(loc);
                    let name = ctx.str(*single);
                    ctx.diagnostics.error(
                        span,
                        format!(
                            "'{}' is ambiguous, it has more than one public definition",
                            name
                        ),
                    );
                }
                _ => {
                    let span = ctx.token_span(loc);
                    let name = ctx.str(*single);
                    ctx.diagnostics
                        .error(span, format!("unknown symbol '{}'", name));
                }
            }
        }
        [prefix @ .., last] => {
            let module_name = const_eval::join_path(ctx, prefix);
            if ctx.find_module(module_name).is_none() {
                let span = ctx.token_span(loc);
                let name = ctx.str(module_name);
                ctx.diagnostics
                    .error(span, format!("unknown module '{}'", name));
                return;
            }
            match ctx.find_qualified_symbol(module_name, *last) {
                Some(GlobalSymbol::Decl(decl_id))
                    if !ctx.decl_arena.deref(decl_id).pruned => {}
                Some(GlobalSymbol::Poisoned) => {
                    let span = ctx.token_span(loc);
                    let name = ctx.str(*last);
                    ctx.diagnostics.error(
                        span,
                        format!(
                            "'{}' is ambiguous, it has more than one public definition",
                            name
                        ),
                    );
                }
                _ => {
                    let span = ctx.token_span(loc);
                    let symbol = ctx.str(*last);
                    let module = ctx.str(module_name);
                    ctx.diagnostics.error(
                        span,
                        format!("module '{}' has no public symbol '{}'", module, symbol),
                    );
                }
            }
        }
        [] => {}
    }
}

fn report_const_error(ctx: &mut GlobalContext, err: &ConstEvalError) {
    let span = ctx.token_span(err.loc());
    let message = err.message(ctx);
    ctx.diagnostics.error(span, message);
}
