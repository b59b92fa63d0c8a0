//! AST dump for `--parse-only`.
//!
//! Renders one parsed file as a JSON tree with names resolved through the
//! interner, so the output is readable without arena handles.

use serde_json::{json, Value};

use crate::context::GlobalContext;
use crate::decl::{Decl, DeclKind, Visibility};
use crate::ids::{AstId, ExprId, TypeInfoId};
use crate::syntax::ast::{AstKind, ExprKind, TypeInfoKind};
use crate::syntax::parser::AnalysisContext;

/// Render a parsed file to a JSON value.
pub fn dump_unit(ctx: &GlobalContext, unit: &AnalysisContext) -> Value {
    let module = ctx.module(unit.module);
    json!({
        "module": ctx.str(module.name),
        "generic_parameters": module.parameters.as_ref().map(|params| {
            params.iter().map(|&p| ctx.str(p)).collect::<Vec<_>>()
        }),
        "decls": unit
            .decls
            .iter()
            .map(|&d| dump_decl(ctx, ctx.decl_arena.deref(d)))
            .collect::<Vec<_>>(),
    })
}

fn visibility_str(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Private => "private",
        Visibility::Public => "public",
        Visibility::Extern => "extern",
    }
}

fn dump_decl(ctx: &GlobalContext, decl: &Decl) -> Value {
    let mut value = match &decl.kind {
        DeclKind::None => json!({ "kind": "none" }),
        DeclKind::Var {
            is_const,
            type_info,
            init,
            ..
        } => json!({
            "kind": if *is_const { "const" } else { "var" },
            "name": ctx.str(decl.name),
            "type": type_info.map(|t| dump_type(ctx, t)),
            "init": init.map(|e| dump_expr(ctx, e)),
        }),
        DeclKind::Func {
            ret_type,
            params,
            body,
        } => json!({
            "kind": "fn",
            "name": ctx.str(decl.name),
            "return_type": ret_type.map(|t| dump_type(ctx, t)),
            "params": params
                .iter()
                .map(|p| json!({
                    "name": ctx.str(p.name),
                    "type": dump_type(ctx, p.type_info),
                }))
                .collect::<Vec<_>>(),
            "body": body.map(|b| dump_stmt(ctx, b)),
        }),
        DeclKind::TypeDef { underlying } => json!({
            "kind": "typedef",
            "name": ctx.str(decl.name),
            "underlying": dump_type(ctx, *underlying),
        }),
        DeclKind::Import { path, .. } => json!({
            "kind": "import",
            "path": path.iter().map(|&n| ctx.str(n)).collect::<Vec<_>>(),
        }),
        DeclKind::CtAssert { expr, message } => json!({
            "kind": "$assert",
            "expr": dump_expr(ctx, *expr),
            "message": message,
        }),
    };
    if let Some(obj) = value.as_object_mut() {
        obj.insert("visibility".into(), json!(visibility_str(decl.visibility)));
        if let Some(gate) = decl.when_gate {
            obj.insert("when".into(), json!(ctx.str(gate)));
        }
    }
    value
}

fn dump_type(ctx: &GlobalContext, id: TypeInfoId) -> Value {
    match &ctx.type_info_arena.deref(id).kind {
        TypeInfoKind::Unparsed => json!("<unparsed>"),
        TypeInfoKind::Builtin(b) => json!(format!("{:?}", b).to_lowercase()),
        TypeInfoKind::Named(name) => json!(ctx.str(*name)),
        TypeInfoKind::Pointer(inner) => {
            json!({ "pointer": dump_type(ctx, *inner) })
        }
    }
}

fn dump_stmt(ctx: &GlobalContext, id: AstId) -> Value {
    match &ctx.ast_arena.deref(id).kind {
        AstKind::Empty => json!(null),
        AstKind::Compound { statements } => json!({
            "block": statements.iter().map(|&s| dump_stmt(ctx, s)).collect::<Vec<_>>(),
        }),
        AstKind::Return { value } => json!({
            "return": value.map(|e| dump_expr(ctx, e)),
        }),
        AstKind::ExprStmt { expr } => json!({
            "expr": dump_expr(ctx, *expr),
        }),
        AstKind::LocalVar {
            name,
            type_info,
            init,
        } => json!({
            "local": ctx.str(*name),
            "type": dump_type(ctx, *type_info),
            "init": init.map(|e| dump_expr(ctx, e)),
        }),
        AstKind::If {
            cond,
            then_body,
            else_body,
        } => json!({
            "if": dump_expr(ctx, *cond),
            "then": dump_stmt(ctx, *then_body),
            "else": else_body.map(|e| dump_stmt(ctx, e)),
        }),
        AstKind::While { cond, body } => json!({
            "while": dump_expr(ctx, *cond),
            "body": dump_stmt(ctx, *body),
        }),
    }
}

fn dump_expr(ctx: &GlobalContext, id: ExprId) -> Value {
    match &ctx.expr_arena.deref(id).kind {
        ExprKind::Poisoned => json!("<poisoned>"),
        ExprKind::IntConst(v) => json!(v),
        ExprKind::RealConst(v) => json!(v),
        ExprKind::StrConst(s) => json!(s),
        ExprKind::Path { segments } => {
            let path: Vec<String> = segments.iter().map(|&n| ctx.str(n)).collect();
            json!(path.join("."))
        }
        ExprKind::Unary { op, operand } => json!({
            "op": format!("{:?}", op),
            "operand": dump_expr(ctx, *operand),
        }),
        ExprKind::Binary { op, lhs, rhs } => json!({
            "op": format!("{:?}", op),
            "lhs": dump_expr(ctx, *lhs),
            "rhs": dump_expr(ctx, *rhs),
        }),
        ExprKind::Call { callee, args } => json!({
            "call": dump_expr(ctx, *callee),
            "args": args.iter().map(|&a| dump_expr(ctx, a)).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_file;

    #[test]
    fn test_dump_round_trips_names() {
        let mut ctx = GlobalContext::new(None, 1024);
        let id = ctx
            .sources
            .add_inline("module demo;\npublic fn int answer() { return 42; }\n");
        let (unit, ok) = parse_file(&mut ctx, id);
        assert!(ok);

        let value = dump_unit(&ctx, &unit);
        assert_eq!(value["module"], "demo");
        assert_eq!(value["decls"][0]["name"], "answer");
        assert_eq!(value["decls"][0]["visibility"], "public");
    }
}
