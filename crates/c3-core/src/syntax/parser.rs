//! The parser.
//!
//! Parses one lexed file into arena-allocated declarations, registering
//! modules in the global context as a side effect. Name binding is left to
//! the analysis passes; the parser only records declarations on their
//! owning module in parse order.

use crate::context::GlobalContext;
use crate::decl::{Decl, DeclKind, FuncParam, Visibility};
use crate::ids::{AstId, DeclId, ExprId, ModuleId, TokenId, TypeInfoId};
use crate::interner::Name;
use crate::source::SourceId;
use crate::syntax::ast::{
    AstKind, AstNode, BinaryOp, BuiltinType, Expr, ExprKind, TypeInfo, TypeInfoKind, UnaryOp,
};
use crate::syntax::lexer::lex_file;
use crate::syntax::token::{TokenData, TokenType};

/// Per-file analysis context produced by parsing.
#[derive(Debug)]
pub struct AnalysisContext {
    pub source: SourceId,
    pub module: ModuleId,
    /// Declarations this file contributed, in parse order.
    pub decls: Vec<DeclId>,
}

/// Parse a loaded source file. Modules and declarations are registered on
/// the global context as a side effect; errors are reported through the
/// global diagnostics. Returns `false` when parsing failed.
pub fn parse_file(ctx: &mut GlobalContext, source_id: SourceId) -> (AnalysisContext, bool) {
    let tokens = lex_file(ctx, source_id);
    let errors_before = ctx.diagnostics.error_count();

    let mut parser = Parser {
        ctx,
        tokens,
        pos: 0,
        source: source_id,
    };
    let (module, decls) = parser.parse_translation_unit();

    let ok = parser.ctx.diagnostics.error_count() == errors_before;
    (
        AnalysisContext {
            source: source_id,
            module,
            decls,
        },
        ok,
    )
}

struct Parser<'ctx> {
    ctx: &'ctx mut GlobalContext,
    tokens: Vec<TokenId>,
    pos: usize,
    source: SourceId,
}

impl<'ctx> Parser<'ctx> {
    fn current(&self) -> TokenId {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_type(&self) -> TokenType {
        self.ctx.token_type(self.current())
    }

    fn peek_type(&self, offset: usize) -> TokenType {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.ctx.token_type(self.tokens[idx])
    }

    fn advance(&mut self) -> TokenId {
        let tok = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&mut self, ty: TokenType) -> bool {
        if self.current_type() == ty {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ty: TokenType) -> Option<TokenId> {
        if self.current_type() == ty {
            return Some(self.advance());
        }
        self.error_at_current(format!(
            "expected {}, found {}",
            ty.name(),
            self.current_type().name()
        ));
        None
    }

    fn error_at_current(&mut self, message: String) {
        if self.ctx.diagnostics.in_panic_mode {
            return;
        }
        self.ctx.diagnostics.in_panic_mode = true;
        let span = self.ctx.token_span(self.current());
        self.ctx.diagnostics.error(span, message);
    }

    /// Skip to the next likely top-level boundary after an error.
    fn recover_to_top_level(&mut self) {
        self.ctx.diagnostics.in_panic_mode = false;
        loop {
            match self.current_type() {
                TokenType::Eof => return,
                TokenType::Semi | TokenType::RBrace => {
                    self.advance();
                    return;
                }
                TokenType::Module
                | TokenType::Import
                | TokenType::Fn
                | TokenType::Const
                | TokenType::Typedef
                | TokenType::Public
                | TokenType::Extern
                | TokenType::CtAssert => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn ident_name(&self, tok: TokenId) -> Name {
        self.ctx
            .token_data(tok)
            .as_name()
            .unwrap_or(Name::EMPTY)
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn parse_translation_unit(&mut self) -> (ModuleId, Vec<DeclId>) {
        let module = if self.current_type() == TokenType::Module {
            self.parse_module_decl()
        } else {
            self.default_module()
        };

        let mut decls = Vec::new();
        while self.current_type() != TokenType::Eof {
            let before = self.pos;
            if let Some(decl) = self.parse_top_level(module) {
                decls.push(decl);
            }
            if self.ctx.diagnostics.in_panic_mode {
                self.recover_to_top_level();
            }
            if self.pos == before {
                // Nothing consumed; never loop in place.
                self.advance();
            }
        }
        (module, decls)
    }

    fn parse_module_decl(&mut self) -> ModuleId {
        self.expect(TokenType::Module);
        let (segments, full) = self.parse_module_path();
        let parameters = if self.check(TokenType::LParen) {
            let mut params = Vec::new();
            loop {
                match self.current_type() {
                    TokenType::Ident | TokenType::ConstIdent => {
                        let tok = self.advance();
                        params.push(self.ident_name(tok));
                    }
                    _ => {
                        self.error_at_current("expected generic parameter name".to_string());
                        break;
                    }
                }
                if !self.check(TokenType::Comma) {
                    break;
                }
            }
            self.expect(TokenType::RParen);
            Some(params)
        } else {
            None
        };
        self.expect(TokenType::Semi);

        if segments.is_empty() {
            return self.default_module();
        }
        self.ctx.find_or_create_module(full, segments, parameters)
    }

    /// Parse a dotted module path, returning segments and the interned
    /// full path.
    fn parse_module_path(&mut self) -> (Vec<Name>, Name) {
        let mut segments = Vec::new();
        let mut full = String::new();
        loop {
            match self.current_type() {
                TokenType::Ident => {
                    let tok = self.advance();
                    let name = self.ident_name(tok);
                    if !full.is_empty() {
                        full.push('.');
                    }
                    full.push_str(&self.ctx.str(name));
                    segments.push(name);
                }
                _ => {
                    self.error_at_current("expected module path segment".to_string());
                    break;
                }
            }
            if !self.check(TokenType::Dot) {
                break;
            }
        }
        let full = self.ctx.intern(&full);
        (segments, full)
    }

    /// Module for files without a `module` declaration: the sanitized
    /// file stem.
    fn default_module(&mut self) -> ModuleId {
        let stem = self
            .ctx
            .sources
            .get(self.source)
            .and_then(|s| s.path.as_ref())
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());
        let sanitized: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let name = self.ctx.intern(&sanitized);
        self.ctx.find_or_create_module(name, vec![name], None)
    }

    fn parse_top_level(&mut self, module: ModuleId) -> Option<DeclId> {
        let when_gate = self.parse_when_gate();

        let visibility = match self.current_type() {
            TokenType::Public => {
                self.advance();
                Visibility::Public
            }
            TokenType::Extern => {
                self.advance();
                Visibility::Extern
            }
            _ => Visibility::Private,
        };

        match self.current_type() {
            TokenType::Import => self.parse_import(module, when_gate),
            TokenType::Fn => self.parse_function(module, visibility, when_gate),
            TokenType::Const => self.parse_const(module, visibility, when_gate),
            TokenType::Typedef => self.parse_typedef(module, visibility, when_gate),
            TokenType::CtAssert => self.parse_ct_assert(module, when_gate),
            TokenType::Module => {
                self.error_at_current("module declaration must come first".to_string());
                None
            }
            ty if ty.is_type_keyword() || ty == TokenType::Ident => {
                self.parse_global_var(module, visibility, when_gate)
            }
            _ => {
                self.error_at_current(format!(
                    "expected a declaration, found {}",
                    self.current_type().name()
                ));
                None
            }
        }
    }

    /// Optional `@when(CONST)` conditional-compilation gate.
    fn parse_when_gate(&mut self) -> Option<Name> {
        if self.current_type() != TokenType::At {
            return None;
        }
        self.advance();
        let attr = self.expect(TokenType::Ident)?;
        let attr_name = self.ident_name(attr);
        if &*self.ctx.str(attr_name) != "when" {
            self.error_at_current(format!("unknown attribute '{}'", self.ctx.str(attr_name)));
            return None;
        }
        self.expect(TokenType::LParen)?;
        let gate_tok = match self.current_type() {
            TokenType::ConstIdent | TokenType::Ident => self.advance(),
            _ => {
                self.error_at_current("expected constant name in @when".to_string());
                return None;
            }
        };
        self.expect(TokenType::RParen)?;
        Some(self.ident_name(gate_tok))
    }

    fn finish_decl(&mut self, module: ModuleId, decl: Decl) -> DeclId {
        let id = self.ctx.decl_arena.alloc(decl);
        self.ctx.module_mut(module).decls.push(id);
        id
    }

    fn parse_import(&mut self, module: ModuleId, when_gate: Option<Name>) -> Option<DeclId> {
        let loc = self.expect(TokenType::Import)?;
        let (segments, full) = self.parse_module_path();
        self.expect(TokenType::Semi)?;

        let id = self.finish_decl(
            module,
            Decl {
                name: full,
                kind: DeclKind::Import {
                    path: segments,
                    path_name: full,
                    resolved: None,
                },
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        );
        self.ctx.module_mut(module).imports.push(id);
        Some(id)
    }

    fn parse_function(
        &mut self,
        module: ModuleId,
        visibility: Visibility,
        when_gate: Option<Name>,
    ) -> Option<DeclId> {
        let loc = self.expect(TokenType::Fn)?;
        let ret_type = self.parse_type()?;
        let name_tok = self.expect(TokenType::Ident)?;
        let name = self.ident_name(name_tok);

        self.expect(TokenType::LParen)?;
        let mut params = Vec::new();
        if self.current_type() != TokenType::RParen {
            loop {
                let type_info = self.parse_type()?;
                let param_tok = self.expect(TokenType::Ident)?;
                params.push(FuncParam {
                    name: self.ident_name(param_tok),
                    type_info,
                    loc: param_tok,
                });
                if !self.check(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen)?;

        let body = if self.current_type() == TokenType::LBrace {
            Some(self.parse_block()?)
        } else {
            self.expect(TokenType::Semi)?;
            None
        };

        Some(self.finish_decl(
            module,
            Decl {
                name,
                kind: DeclKind::Func {
                    ret_type: Some(ret_type),
                    params,
                    body,
                },
                visibility,
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        ))
    }

    fn parse_const(
        &mut self,
        module: ModuleId,
        visibility: Visibility,
        when_gate: Option<Name>,
    ) -> Option<DeclId> {
        let loc = self.expect(TokenType::Const)?;
        let type_info = if self.current_type().is_type_keyword() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let name_tok = match self.current_type() {
            TokenType::ConstIdent | TokenType::Ident => self.advance(),
            _ => {
                self.error_at_current("expected constant name".to_string());
                return None;
            }
        };
        let name = self.ident_name(name_tok);
        self.expect(TokenType::Eq)?;
        let init = self.parse_expr()?;
        self.expect(TokenType::Semi)?;

        Some(self.finish_decl(
            module,
            Decl {
                name,
                kind: DeclKind::Var {
                    is_const: true,
                    type_info,
                    init: Some(init),
                    const_value: None,
                },
                visibility,
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        ))
    }

    fn parse_global_var(
        &mut self,
        module: ModuleId,
        visibility: Visibility,
        when_gate: Option<Name>,
    ) -> Option<DeclId> {
        let loc = self.current();
        let type_info = self.parse_type()?;
        let name_tok = self.expect(TokenType::Ident)?;
        let name = self.ident_name(name_tok);
        let init = if self.check(TokenType::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenType::Semi)?;

        Some(self.finish_decl(
            module,
            Decl {
                name,
                kind: DeclKind::Var {
                    is_const: false,
                    type_info: Some(type_info),
                    init,
                    const_value: None,
                },
                visibility,
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        ))
    }

    fn parse_typedef(
        &mut self,
        module: ModuleId,
        visibility: Visibility,
        when_gate: Option<Name>,
    ) -> Option<DeclId> {
        let loc = self.expect(TokenType::Typedef)?;
        let name_tok = self.expect(TokenType::Ident)?;
        let name = self.ident_name(name_tok);
        self.expect(TokenType::Eq)?;
        let underlying = self.parse_type()?;
        self.expect(TokenType::Semi)?;

        Some(self.finish_decl(
            module,
            Decl {
                name,
                kind: DeclKind::TypeDef { underlying },
                visibility,
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        ))
    }

    fn parse_ct_assert(&mut self, module: ModuleId, when_gate: Option<Name>) -> Option<DeclId> {
        let loc = self.expect(TokenType::CtAssert)?;
        self.expect(TokenType::LParen)?;
        let expr = self.parse_expr()?;
        let message = if self.check(TokenType::Comma) {
            let msg_tok = self.expect(TokenType::String)?;
            match self.ctx.token_data(msg_tok) {
                TokenData::Str(s) => Some(s.clone()),
                _ => None,
            }
        } else {
            None
        };
        self.expect(TokenType::RParen)?;
        self.expect(TokenType::Semi)?;

        Some(self.finish_decl(
            module,
            Decl {
                name: Name::EMPTY,
                kind: DeclKind::CtAssert { expr, message },
                module,
                loc,
                when_gate,
                ..Decl::default()
            },
        ))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> Option<TypeInfoId> {
        let loc = self.current();
        let kind = match self.current_type() {
            ty if ty.is_type_keyword() => {
                self.advance();
                TypeInfoKind::Builtin(builtin_for(ty))
            }
            TokenType::Ident => {
                let tok = self.advance();
                TypeInfoKind::Named(self.ident_name(tok))
            }
            _ => {
                self.error_at_current(format!(
                    "expected a type, found {}",
                    self.current_type().name()
                ));
                return None;
            }
        };
        let mut id = self.ctx.type_info_arena.alloc(TypeInfo {
            kind,
            loc,
            ..TypeInfo::default()
        });
        while self.check(TokenType::Star) {
            id = self.ctx.type_info_arena.alloc(TypeInfo {
                kind: TypeInfoKind::Pointer(id),
                loc,
                ..TypeInfo::default()
            });
        }
        Some(id)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Option<AstId> {
        let loc = self.expect(TokenType::LBrace)?;
        let mut statements = Vec::new();
        while self.current_type() != TokenType::RBrace && self.current_type() != TokenType::Eof {
            let before = self.pos;
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            if self.ctx.diagnostics.in_panic_mode {
                self.ctx.diagnostics.in_panic_mode = false;
                while !matches!(
                    self.current_type(),
                    TokenType::Semi | TokenType::RBrace | TokenType::Eof
                ) {
                    self.advance();
                }
                self.check(TokenType::Semi);
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenType::RBrace)?;
        Some(self.ctx.ast_arena.alloc(AstNode {
            kind: AstKind::Compound { statements },
            loc,
        }))
    }

    fn parse_statement(&mut self) -> Option<AstId> {
        match self.current_type() {
            TokenType::LBrace => self.parse_block(),
            TokenType::Return => {
                let loc = self.advance();
                let value = if self.current_type() != TokenType::Semi {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenType::Semi)?;
                Some(self.ctx.ast_arena.alloc(AstNode {
                    kind: AstKind::Return { value },
                    loc,
                }))
            }
            TokenType::If => {
                let loc = self.advance();
                self.expect(TokenType::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                let then_body = self.parse_statement()?;
                let else_body = if self.check(TokenType::Else) {
                    Some(self.parse_statement()?)
                } else {
                    None
                };
                Some(self.ctx.ast_arena.alloc(AstNode {
                    kind: AstKind::If {
                        cond,
                        then_body,
                        else_body,
                    },
                    loc,
                }))
            }
            TokenType::While => {
                let loc = self.advance();
                self.expect(TokenType::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                let body = self.parse_statement()?;
                Some(self.ctx.ast_arena.alloc(AstNode {
                    kind: AstKind::While { cond, body },
                    loc,
                }))
            }
            ty if ty.is_type_keyword() => self.parse_local_var(),
            TokenType::Ident if self.peek_type(1) == TokenType::Ident => self.parse_local_var(),
            _ => {
                let loc = self.current();
                let expr = self.parse_expr()?;
                self.expect(TokenType::Semi)?;
                Some(self.ctx.ast_arena.alloc(AstNode {
                    kind: AstKind::ExprStmt { expr },
                    loc,
                }))
            }
        }
    }

    fn parse_local_var(&mut self) -> Option<AstId> {
        let loc = self.current();
        let type_info = self.parse_type()?;
        let name_tok = self.expect(TokenType::Ident)?;
        let name = self.ident_name(name_tok);
        let init = if self.check(TokenType::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenType::Semi)?;
        Some(self.ctx.ast_arena.alloc(AstNode {
            kind: AstKind::LocalVar {
                name,
                type_info,
                init,
            },
            loc,
        }))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Option<ExprId> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Option<ExprId> {
        let lhs = self.parse_binary(0)?;
        if self.current_type() == TokenType::Eq {
            let loc = self.advance();
            let rhs = self.parse_assignment()?;
            return Some(self.ctx.expr_arena.alloc(Expr {
                kind: ExprKind::Binary {
                    op: BinaryOp::Assign,
                    lhs,
                    rhs,
                },
                loc,
            }));
        }
        Some(lhs)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Option<ExprId> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, prec) = match self.current_type() {
                TokenType::Star => (BinaryOp::Mul, 10),
                TokenType::Slash => (BinaryOp::Div, 10),
                TokenType::Percent => (BinaryOp::Mod, 10),
                TokenType::Plus => (BinaryOp::Add, 9),
                TokenType::Minus => (BinaryOp::Sub, 9),
                TokenType::Lt => (BinaryOp::Lt, 8),
                TokenType::Gt => (BinaryOp::Gt, 8),
                TokenType::LtEq => (BinaryOp::Le, 8),
                TokenType::GtEq => (BinaryOp::Ge, 8),
                TokenType::EqEq => (BinaryOp::Eq, 7),
                TokenType::NotEq => (BinaryOp::Ne, 7),
                TokenType::Amp => (BinaryOp::BitAnd, 6),
                TokenType::Caret => (BinaryOp::BitXor, 5),
                TokenType::Pipe => (BinaryOp::BitOr, 4),
                TokenType::AmpAmp => (BinaryOp::And, 3),
                TokenType::PipePipe => (BinaryOp::Or, 2),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            let loc = self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = self.ctx.expr_arena.alloc(Expr {
                kind: ExprKind::Binary { op, lhs, rhs },
                loc,
            });
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> Option<ExprId> {
        let op = match self.current_type() {
            TokenType::Minus => Some(UnaryOp::Neg),
            TokenType::Bang => Some(UnaryOp::Not),
            TokenType::Amp => Some(UnaryOp::AddrOf),
            _ => None,
        };
        if let Some(op) = op {
            let loc = self.advance();
            let operand = self.parse_unary()?;
            return Some(self.ctx.expr_arena.alloc(Expr {
                kind: ExprKind::Unary { op, operand },
                loc,
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current_type() {
                TokenType::LParen => {
                    let loc = self.advance();
                    let mut args = Vec::new();
                    if self.current_type() != TokenType::RParen {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.check(TokenType::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenType::RParen)?;
                    expr = self.ctx.expr_arena.alloc(Expr {
                        kind: ExprKind::Call { callee: expr, args },
                        loc,
                    });
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<ExprId> {
        let loc = self.current();
        match self.current_type() {
            TokenType::Integer => {
                let tok = self.advance();
                let value = self.ctx.token_data(tok).as_int().unwrap_or(0);
                Some(self.ctx.expr_arena.alloc(Expr {
                    kind: ExprKind::IntConst(value),
                    loc,
                }))
            }
            TokenType::Real => {
                let tok = self.advance();
                let value = match self.ctx.token_data(tok) {
                    TokenData::Real(v) => *v,
                    _ => 0.0,
                };
                Some(self.ctx.expr_arena.alloc(Expr {
                    kind: ExprKind::RealConst(value),
                    loc,
                }))
            }
            TokenType::String => {
                let tok = self.advance();
                let value = match self.ctx.token_data(tok) {
                    TokenData::Str(s) => s.clone(),
                    _ => String::new(),
                };
                Some(self.ctx.expr_arena.alloc(Expr {
                    kind: ExprKind::StrConst(value),
                    loc,
                }))
            }
            TokenType::CharLit => {
                let tok = self.advance();
                let value = self.ctx.token_data(tok).as_int().unwrap_or(0);
                Some(self.ctx.expr_arena.alloc(Expr {
                    kind: ExprKind::IntConst(value),
                    loc,
                }))
            }
            TokenType::Ident | TokenType::ConstIdent => {
                let mut segments = Vec::new();
                let tok = self.advance();
                segments.push(self.ident_name(tok));
                while self.current_type() == TokenType::Dot {
                    self.advance();
                    match self.current_type() {
                        TokenType::Ident | TokenType::ConstIdent => {
                            let tok = self.advance();
                            segments.push(self.ident_name(tok));
                        }
                        _ => {
                            self.error_at_current("expected name after '.'".to_string());
                            break;
                        }
                    }
                }
                Some(self.ctx.expr_arena.alloc(Expr {
                    kind: ExprKind::Path { segments },
                    loc,
                }))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                Some(expr)
            }
            _ => {
                self.error_at_current(format!(
                    "expected an expression, found {}",
                    self.current_type().name()
                ));
                None
            }
        }
    }
}

fn builtin_for(ty: TokenType) -> BuiltinType {
    match ty {
        TokenType::Void => BuiltinType::Void,
        TokenType::Bool => BuiltinType::Bool,
        TokenType::Char => BuiltinType::Char,
        TokenType::Byte => BuiltinType::Byte,
        TokenType::Short => BuiltinType::Short,
        TokenType::UShort => BuiltinType::UShort,
        TokenType::Int => BuiltinType::Int,
        TokenType::UInt => BuiltinType::UInt,
        TokenType::Long => BuiltinType::Long,
        TokenType::ULong => BuiltinType::ULong,
        TokenType::Float => BuiltinType::Float,
        TokenType::Double => BuiltinType::Double,
        _ => unreachable!("not a type keyword"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::DeclKind;

    fn parse(source: &str) -> (GlobalContext, AnalysisContext, bool) {
        let mut ctx = GlobalContext::new(None, 1024);
        let id = ctx.sources.add_inline(source);
        let (unit, ok) = parse_file(&mut ctx, id);
        (ctx, unit, ok)
    }

    #[test]
    fn test_parse_module_registration() {
        let (ctx, unit, ok) = parse("module mod.a;\npublic fn int foo() { return 1; }\n");
        assert!(ok);
        let module = ctx.module(unit.module);
        assert_eq!(&*ctx.interner.str(module.name), "mod.a");
        assert_eq!(module.path.len(), 2);
        assert_eq!(unit.decls.len(), 1);

        let decl = ctx.decl_arena.deref(unit.decls[0]);
        assert_eq!(&*ctx.interner.str(decl.name), "foo");
        assert_eq!(decl.visibility, Visibility::Public);
        assert!(matches!(decl.kind, DeclKind::Func { .. }));
    }

    #[test]
    fn test_same_module_across_files() {
        let mut ctx = GlobalContext::new(None, 1024);
        let f1 = ctx.sources.add_inline("module shared;\nfn void a() {}\n");
        let f2 = ctx.sources.add_inline("module shared;\nfn void b() {}\n");
        let (unit1, ok1) = parse_file(&mut ctx, f1);
        let (unit2, ok2) = parse_file(&mut ctx, f2);
        assert!(ok1 && ok2);
        assert_eq!(unit1.module, unit2.module);
        assert_eq!(ctx.module(unit1.module).decls.len(), 2);
    }

    #[test]
    fn test_parse_generic_module_goes_to_generic_list() {
        let (ctx, unit, ok) = parse("module vec(Type);\nfn void push() {}\n");
        assert!(ok);
        assert!(ctx.module(unit.module).is_generic());
        assert!(ctx.generic_module_list.contains(&unit.module));
        assert!(!ctx.module_list.contains(&unit.module));
    }

    #[test]
    fn test_parse_import() {
        let (ctx, unit, ok) = parse("module a;\nimport mod.b;\n");
        assert!(ok);
        let decl = ctx.decl_arena.deref(unit.decls[0]);
        match &decl.kind {
            DeclKind::Import { path, path_name, resolved } => {
                assert_eq!(path.len(), 2);
                assert_eq!(&*ctx.interner.str(*path_name), "mod.b");
                assert!(resolved.is_none());
            }
            other => panic!("expected import, got {:?}", other),
        }
        assert_eq!(ctx.module(unit.module).imports.len(), 1);
    }

    #[test]
    fn test_parse_const_and_gate() {
        let (ctx, unit, ok) = parse("module a;\n@when(PTR_SIZE) public const int WIDTH = 4;\n");
        assert!(ok);
        let decl = ctx.decl_arena.deref(unit.decls[0]);
        assert!(decl.is_const_var());
        assert!(decl.when_gate.is_some());
        assert_eq!(decl.visibility, Visibility::Public);
    }

    #[test]
    fn test_parse_ct_assert() {
        let (ctx, unit, ok) = parse("module a;\n$assert(1 + 1 == 2, \"math is broken\");\n");
        assert!(ok);
        let decl = ctx.decl_arena.deref(unit.decls[0]);
        match &decl.kind {
            DeclKind::CtAssert { message, .. } => {
                assert_eq!(message.as_deref(), Some("math is broken"));
            }
            other => panic!("expected $assert, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_body() {
        let (ctx, unit, ok) = parse(
            "module a;\nfn int main() { int x = 2; if (x > 1) { return x; } return 0; }\n",
        );
        assert!(ok);
        let decl = ctx.decl_arena.deref(unit.decls[0]);
        match &decl.kind {
            DeclKind::Func { body, params, .. } => {
                assert!(body.is_some());
                assert!(params.is_empty());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_recovers() {
        let (ctx, unit, ok) = parse("module a;\nfn int broken( { return 0; }\nfn void fine() {}\n");
        assert!(!ok);
        assert!(ctx.diagnostics.has_errors());
        // The parser recovered and still saw the second function.
        let names: Vec<String> = unit
            .decls
            .iter()
            .map(|&d| ctx.str(ctx.decl_arena.deref(d).name))
            .collect();
        assert!(names.contains(&"fine".to_string()));
    }

    #[test]
    fn test_default_module_from_inline_source() {
        let (ctx, unit, ok) = parse("fn int main() { return 0; }\n");
        assert!(ok);
        assert_eq!(&*ctx.interner.str(ctx.module(unit.module).name), "main");
    }

    #[test]
    fn test_qualified_path_expr() {
        let (ctx, unit, ok) = parse("module a;\nconst X = std.PTR_SIZE;\n");
        assert!(ok);
        let decl = ctx.decl_arena.deref(unit.decls[0]);
        let init = match &decl.kind {
            DeclKind::Var { init: Some(e), .. } => *e,
            other => panic!("expected const var, got {:?}", other),
        };
        match &ctx.expr_arena.deref(init).kind {
            ExprKind::Path { segments } => assert_eq!(segments.len(), 2),
            other => panic!("expected path, got {:?}", other),
        }
    }
}
