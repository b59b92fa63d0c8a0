//! Compile-time constant evaluation.
//!
//! Evaluates integer/boolean expressions over resolved const declarations.
//! Used by the conditional-compilation pass for `@when` gates, by the
//! `$assert` pass, and by constant resolution in the `Decls` pass.
//! Booleans evaluate to 0 or 1.

use crate::context::GlobalContext;
use crate::ids::{ExprId, ModuleId, TokenId};
use crate::interner::Name;
use crate::symtab::GlobalSymbol;
use crate::syntax::ast::{BinaryOp, ExprKind, UnaryOp};

/// Why an expression could not be evaluated at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstEvalError {
    NotConstant(TokenId),
    UnknownSymbol(Name, TokenId),
    AmbiguousSymbol(Name, TokenId),
    DivisionByZero(TokenId),
}

impl ConstEvalError {
    pub fn message(&self, ctx: &GlobalContext) -> String {
        match self {
            ConstEvalError::NotConstant(_) => "expression is not constant".to_string(),
            ConstEvalError::UnknownSymbol(name, _) => {
                format!("unknown constant '{}'", ctx.str(*name))
            }
            ConstEvalError::AmbiguousSymbol(name, _) => format!(
                "'{}' is ambiguous, it has more than one public definition",
                ctx.str(*name)
            ),
            ConstEvalError::DivisionByZero(_) => "division by zero in constant".to_string(),
        }
    }

    pub fn loc(&self) -> TokenId {
        match self {
            ConstEvalError::NotConstant(loc) | ConstEvalError::DivisionByZero(loc) => *loc,
            ConstEvalError::UnknownSymbol(_, loc) | ConstEvalError::AmbiguousSymbol(_, loc) => *loc,
        }
    }
}

/// Evaluate an expression to an integer constant, resolving names first in
/// `module` and then in the global table.
pub fn eval(ctx: &GlobalContext, module: ModuleId, expr_id: ExprId) -> Result<i64, ConstEvalError> {
    let expr = ctx.expr_arena.deref(expr_id);
    let loc = expr.loc;
    match &expr.kind {
        ExprKind::IntConst(v) => Ok(*v as i64),
        ExprKind::Path { segments } => eval_path(ctx, module, segments, loc),
        ExprKind::Unary { op, operand } => {
            let value = eval(ctx, module, *operand)?;
            match op {
                UnaryOp::Neg => Ok(-value),
                UnaryOp::Not => Ok((value == 0) as i64),
                UnaryOp::AddrOf => Err(ConstEvalError::NotConstant(loc)),
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let l = eval(ctx, module, *lhs)?;
            let r = eval(ctx, module, *rhs)?;
            match op {
                BinaryOp::Add => Ok(l.wrapping_add(r)),
                BinaryOp::Sub => Ok(l.wrapping_sub(r)),
                BinaryOp::Mul => Ok(l.wrapping_mul(r)),
                BinaryOp::Div => {
                    if r == 0 {
                        Err(ConstEvalError::DivisionByZero(loc))
                    } else {
                        Ok(l.wrapping_div(r))
                    }
                }
                BinaryOp::Mod => {
                    if r == 0 {
                        Err(ConstEvalError::DivisionByZero(loc))
                    } else {
                        Ok(l.wrapping_rem(r))
                    }
                }
                BinaryOp::Eq => Ok((l == r) as i64),
                BinaryOp::Ne => Ok((l != r) as i64),
                BinaryOp::Lt => Ok((l < r) as i64),
                BinaryOp::Gt => Ok((l > r) as i64),
                BinaryOp::Le => Ok((l <= r) as i64),
                BinaryOp::Ge => Ok((l >= r) as i64),
                BinaryOp::And => Ok((l != 0 && r != 0) as i64),
                BinaryOp::Or => Ok((l != 0 || r != 0) as i64),
                BinaryOp::BitAnd => Ok(l & r),
                BinaryOp::BitOr => Ok(l | r),
                BinaryOp::BitXor => Ok(l ^ r),
                BinaryOp::Assign => Err(ConstEvalError::NotConstant(loc)),
            }
        }
        _ => Err(ConstEvalError::NotConstant(loc)),
    }
}

fn eval_path(
    ctx: &GlobalContext,
    module: ModuleId,
    segments: &[Name],
    loc: TokenId,
) -> Result<i64, ConstEvalError> {
    let symbol = match segments {
        [single] => {
            // Module-local constants shadow the global table.
            if let Some(&decl_id) = ctx.module(module).symbols.get(*single) {
                Some(GlobalSymbol::Decl(decl_id))
            } else {
                ctx.find_symbol(*single)
            }
        }
        [prefix @ .., last] => {
            let module_name = join_path(ctx, prefix);
            ctx.find_qualified_symbol(module_name, *last)
        }
        [] => None,
    };

    let name = *segments.last().unwrap_or(&Name::EMPTY);
    match symbol {
        Some(GlobalSymbol::Poisoned) => Err(ConstEvalError::AmbiguousSymbol(name, loc)),
        Some(GlobalSymbol::Decl(decl_id)) => {
            let decl = ctx.decl_arena.deref(decl_id);
            if decl.pruned {
                return Err(ConstEvalError::UnknownSymbol(name, loc));
            }
            decl.const_value()
                .ok_or(ConstEvalError::NotConstant(loc))
        }
        None => Err(ConstEvalError::UnknownSymbol(name, loc)),
    }
}

/// Join path segments into an interned dotted name.
pub fn join_path(ctx: &GlobalContext, segments: &[Name]) -> Name {
    let mut full = String::new();
    for (i, &segment) in segments.iter().enumerate() {
        if i > 0 {
            full.push('.');
        }
        full.push_str(&ctx.str(segment));
    }
    ctx.intern(&full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_file;

    fn eval_const(source: &str) -> Result<i64, String> {
        let mut ctx = GlobalContext::new(None, 1024);
        let id = ctx.sources.add_inline(source);
        let (unit, ok) = parse_file(&mut ctx, id);
        assert!(ok, "parse failed: {}", ctx.diagnostics.render(&ctx.sources));
        let decl = ctx.decl_arena.deref(*unit.decls.last().unwrap());
        let init = match &decl.kind {
            crate::decl::DeclKind::Var { init: Some(e), .. } => *e,
            other => panic!("expected const var, got {:?}", other),
        };
        eval(&ctx, unit.module, init).map_err(|e| e.message(&ctx))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_const("module m;\nconst X = 2 + 3 * 4;"), Ok(14));
        assert_eq!(eval_const("module m;\nconst X = (2 + 3) * 4;"), Ok(20));
        assert_eq!(eval_const("module m;\nconst X = -7 % 3;"), Ok(-1));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_const("module m;\nconst X = 1 < 2 && 3 == 3;"), Ok(1));
        assert_eq!(eval_const("module m;\nconst X = !1 || 0;"), Ok(0));
    }

    #[test]
    fn test_predefined_constant_reference() {
        let value = eval_const("module m;\nconst X = PTR_SIZE * 8;").unwrap();
        assert!(value == 32 || value == 64);
    }

    #[test]
    fn test_qualified_reference() {
        let value = eval_const("module m;\nconst X = std.INT_SIZE;").unwrap();
        assert_eq!(value, 4);
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_const("module m;\nconst X = 1 / 0;").unwrap_err();
        assert!(err.contains("division by zero"));
    }

    #[test]
    fn test_unknown_symbol() {
        let err = eval_const("module m;\nconst X = NO_SUCH;").unwrap_err();
        assert!(err.contains("unknown constant"));
    }
}
