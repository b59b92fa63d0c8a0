//! Declaration records.
//!
//! Declarations live in the decl arena and are owned by their module.
//! A zero-initialized [`Decl`] (from `alloc_zeroed`) has no name, private
//! visibility and unresolved status; the parser fills in the rest.

use crate::ids::{AstId, ExprId, ModuleId, TokenId, TypeInfoId};
use crate::interner::Name;

/// Who can see a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Extern,
}

/// Resolution state, advanced by the `Decls` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveStatus {
    #[default]
    Unresolved,
    InProgress,
    Done,
    Poisoned,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct FuncParam {
    pub name: Name,
    pub type_info: TypeInfoId,
    pub loc: TokenId,
}

/// Kind tag plus kind-specific payload.
#[derive(Debug, Clone, Default)]
pub enum DeclKind {
    /// Zero-initialized placeholder; never survives parsing.
    #[default]
    None,
    Var {
        is_const: bool,
        type_info: Option<TypeInfoId>,
        init: Option<ExprId>,
        /// Filled in by constant resolution for const vars.
        const_value: Option<i64>,
    },
    Func {
        ret_type: Option<TypeInfoId>,
        params: Vec<FuncParam>,
        body: Option<AstId>,
    },
    TypeDef {
        underlying: TypeInfoId,
    },
    Import {
        path: Vec<Name>,
        /// Full dotted path, interned.
        path_name: Name,
        resolved: Option<ModuleId>,
    },
    CtAssert {
        expr: ExprId,
        message: Option<String>,
    },
}

/// One declaration. Owned by `module`; stored in the decl arena.
#[derive(Debug, Clone, Default)]
pub struct Decl {
    pub name: Name,
    pub kind: DeclKind,
    pub visibility: Visibility,
    pub module: ModuleId,
    pub resolve_status: ResolveStatus,
    pub loc: TokenId,
    /// Optional `@when(CONST)` conditional-compilation gate.
    pub when_gate: Option<Name>,
    /// Set by the conditional-compilation pass; pruned decls are skipped
    /// by every later pass and by codegen.
    pub pruned: bool,
}

impl Decl {
    pub fn is_const_var(&self) -> bool {
        matches!(self.kind, DeclKind::Var { is_const: true, .. })
    }

    /// Constant value if this is a resolved const var.
    pub fn const_value(&self) -> Option<i64> {
        match self.kind {
            DeclKind::Var { const_value, .. } => const_value,
            _ => None,
        }
    }

    /// Whether this decl produces a symbol visible to name lookup.
    /// Imports and compile-time asserts do not.
    pub fn is_symbol(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Var { .. } | DeclKind::Func { .. } | DeclKind::TypeDef { .. }
        )
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, DeclKind::TypeDef { .. })
    }
}
