//! The global compilation context.
//!
//! One [`GlobalContext`] exists per compilation. It owns the seven front-end
//! arenas, the string interner, the module registry, the global and
//! qualified symbol tables, the synthetic standard-library module and the
//! shared scratch buffer. Everything is mutated on the driver thread only;
//! backend workers never see it.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::arena::Arena;
use crate::compiler::CompileError;
use crate::decl::{Decl, DeclKind, ResolveStatus, Visibility};
use crate::diagnostic::Diagnostics;
use crate::ids::{AstId, DeclId, ExprId, ModuleId, TokenId, TypeInfoId};
use crate::interner::{Interner, Name};
use crate::module::{AnalysisStage, Module};
use crate::source::SourceMap;
use crate::symtab::{GlobalSymbol, SymbolTable};
use crate::syntax::ast::{AstNode, Expr, ExprKind, TypeInfo};
use crate::syntax::token::{SourceLoc, TokenData, TokenType};

/// Capacity of the shared scratch buffer, including the terminator slot.
pub const MAX_STRING_BUFFER: usize = 0x1_0000;

/// Default identifier symbol-table capacity.
pub const DEFAULT_SYMTAB_SIZE: usize = 64 * 1024;

/// Per-module symbol-table capacity.
const MODULE_SYMTAB_CAPACITY: usize = 0x1_0000;

/// A bounded append-only text builder shared across the compiler.
///
/// Callers must `clear` between uses; exceeding the capacity is a fatal
/// configuration error.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: String,
}

impl ScratchBuffer {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(256),
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn append(&mut self, text: &str) -> Result<(), CompileError> {
        if self.buf.len() + text.len() > MAX_STRING_BUFFER - 1 {
            return Err(CompileError::ScratchOverflow);
        }
        self.buf.push_str(text);
        Ok(())
    }

    pub fn append_char(&mut self, c: char) -> Result<(), CompileError> {
        if self.buf.len() + c.len_utf8() > MAX_STRING_BUFFER - 1 {
            return Err(CompileError::ScratchOverflow);
        }
        self.buf.push(c);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Process-wide compilation state.
pub struct GlobalContext {
    pub interner: Interner,

    pub ast_arena: Arena<AstId, AstNode>,
    pub expr_arena: Arena<ExprId, Expr>,
    pub decl_arena: Arena<DeclId, Decl>,
    pub type_info_arena: Arena<TypeInfoId, TypeInfo>,
    pub sourceloc_arena: Arena<TokenId, SourceLoc>,
    pub toktype_arena: Arena<TokenId, TokenType>,
    pub tokdata_arena: Arena<TokenId, TokenData>,

    /// Module storage; never freed.
    modules: Arena<ModuleId, Module>,
    /// Full dotted path -> module.
    module_registry: SymbolTable<ModuleId>,
    /// Non-generic modules in parse order; the analysis and codegen
    /// iteration order.
    pub module_list: Vec<ModuleId>,
    /// Parameterized modules; registered but never scheduled.
    pub generic_module_list: Vec<ModuleId>,

    /// Unqualified name -> declaration or poison.
    pub global_symbols: SymbolTable<GlobalSymbol>,
    /// Module path -> (name -> declaration or poison).
    qualified_symbols: FxHashMap<Name, SymbolTable<GlobalSymbol>>,
    /// Shared scratch symbol table for codegen name mangling.
    pub scratch_table: SymbolTable<Name>,

    pub scratch: ScratchBuffer,
    pub diagnostics: Diagnostics,
    pub sources: SourceMap,

    /// The synthetic standard-library module, pre-set to the final stage
    /// and pre-populated with predefined compile-time constants.
    pub std_module: ModuleId,
    pub lib_dir: Option<PathBuf>,
}

impl GlobalContext {
    /// Initialize the context. Must happen exactly once, before parsing.
    pub fn new(lib_dir: Option<PathBuf>, symtab_size: usize) -> Self {
        let capacity = if symtab_size == 0 {
            DEFAULT_SYMTAB_SIZE
        } else {
            symtab_size
        };

        let mut ctx = Self {
            interner: Interner::with_capacity(capacity),
            ast_arena: Arena::with_capacity(4096),
            expr_arena: Arena::with_capacity(4096),
            decl_arena: Arena::with_capacity(1024),
            type_info_arena: Arena::with_capacity(1024),
            sourceloc_arena: Arena::with_capacity(4096),
            toktype_arena: Arena::with_capacity(4096),
            tokdata_arena: Arena::with_capacity(4096),
            modules: Arena::with_capacity(64),
            module_registry: SymbolTable::with_capacity(64),
            module_list: Vec::new(),
            generic_module_list: Vec::new(),
            global_symbols: SymbolTable::with_capacity(0x1000),
            qualified_symbols: FxHashMap::default(),
            scratch_table: SymbolTable::with_capacity(32),
            scratch: ScratchBuffer::new(),
            diagnostics: Diagnostics::new(),
            sources: SourceMap::new(),
            std_module: ModuleId::default(),
            lib_dir: None,
        };

        // Discard handle 0 in the arenas that reserve it as a sentinel.
        let _ = ctx.sourceloc_arena.alloc_zeroed();
        let _ = ctx.toktype_arena.alloc_zeroed();
        let _ = ctx.tokdata_arena.alloc_zeroed();

        ctx.lib_dir = lib_dir.or_else(find_lib_dir);

        ctx.init_std_module();
        ctx
    }

    /// Reset error state before a fresh compilation unit.
    pub fn clear_errors(&mut self) {
        self.diagnostics.clear_counts();
    }

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn str(&self, name: Name) -> String {
        self.interner.str(name).to_string()
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Allocate one token across the three parallel token arenas.
    pub fn alloc_token(&mut self, ty: TokenType, data: TokenData, loc: SourceLoc) -> TokenId {
        let id = self.toktype_arena.alloc(ty);
        let data_id = self.tokdata_arena.alloc(data);
        let loc_id = self.sourceloc_arena.alloc(loc);
        debug_assert_eq!(id, data_id);
        debug_assert_eq!(id, loc_id);
        id
    }

    pub fn token_type(&self, id: TokenId) -> TokenType {
        *self.toktype_arena.deref(id)
    }

    pub fn token_data(&self, id: TokenId) -> &TokenData {
        self.tokdata_arena.deref(id)
    }

    pub fn token_loc(&self, id: TokenId) -> SourceLoc {
        *self.sourceloc_arena.deref(id)
    }

    /// Resolved span for a token, for diagnostics. Falls back to an empty
    /// span for the sentinel handle.
    pub fn token_span(&self, id: TokenId) -> crate::source::Span {
        if id.is_none() {
            return crate::source::Span::default();
        }
        self.token_loc(id).span()
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    pub fn module(&self, id: ModuleId) -> &Module {
        self.modules.deref(id)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        self.modules.deref_mut(id)
    }

    pub fn find_module(&self, name: Name) -> Option<ModuleId> {
        self.module_registry.get(name).copied()
    }

    /// Find a module by its full dotted path, creating and registering it
    /// on first sight. Parameterized modules go to the generic list and
    /// are not scheduled by the analysis driver.
    pub fn find_or_create_module(
        &mut self,
        name: Name,
        path: Vec<Name>,
        parameters: Option<Vec<Name>>,
    ) -> ModuleId {
        if let Some(id) = self.find_module(name) {
            return id;
        }

        debug!(module = %self.str(name), "creating module");
        let generic = parameters.is_some();
        let module = Module::new(name, path, parameters, MODULE_SYMTAB_CAPACITY);
        let id = self.modules.alloc(module);
        self.module_registry.set(name, id);
        if generic {
            self.generic_module_list.push(id);
        } else {
            self.module_list.push(id);
        }
        id
    }

    // ------------------------------------------------------------------
    // Global symbol registration
    // ------------------------------------------------------------------

    /// Make a declaration globally visible under its unqualified name and
    /// under its module's qualified namespace.
    ///
    /// A second public definition of the same name poisons the entry
    /// instead of silently favoring one definition, so use sites can
    /// report a precise ambiguity.
    pub fn register_public_symbol(&mut self, decl_id: DeclId) {
        let decl = self.decl_arena.deref(decl_id);
        let name = decl.name;
        let module_name = self.modules.deref(decl.module).name;
        debug_assert!(!name.is_empty());

        let entry = match self.global_symbols.get(name) {
            Some(GlobalSymbol::Poisoned) => GlobalSymbol::Poisoned,
            Some(GlobalSymbol::Decl(_)) => GlobalSymbol::Poisoned,
            None => GlobalSymbol::Decl(decl_id),
        };
        self.global_symbols.set(name, entry);

        let namespace = self
            .qualified_symbols
            .entry(module_name)
            .or_insert_with(|| SymbolTable::with_capacity(0x100));
        let entry = match namespace.get(name) {
            Some(GlobalSymbol::Poisoned) => GlobalSymbol::Poisoned,
            Some(GlobalSymbol::Decl(_)) => GlobalSymbol::Poisoned,
            None => GlobalSymbol::Decl(decl_id),
        };
        namespace.set(name, entry);
    }

    /// Unqualified global lookup.
    pub fn find_symbol(&self, name: Name) -> Option<GlobalSymbol> {
        self.global_symbols.get(name).copied()
    }

    /// Qualified lookup: `module_name` is a full dotted module path.
    pub fn find_qualified_symbol(&self, module_name: Name, name: Name) -> Option<GlobalSymbol> {
        self.qualified_symbols
            .get(&module_name)?
            .get(name)
            .copied()
    }

    // ------------------------------------------------------------------
    // Standard-library module
    // ------------------------------------------------------------------

    fn init_std_module(&mut self) {
        let std_name = self.intern("std");
        let std_module = self.find_or_create_module(std_name, vec![std_name], None);
        // The std module is synthetic; it is pre-set to the final stage so
        // every analysis sweep skips it.
        self.module_mut(std_module).stage = AnalysisStage::LAST;
        // Keep it out of the scheduled list entirely.
        self.module_list.retain(|&m| m != std_module);
        self.std_module = std_module;

        self.add_global_define_int("PTR_SIZE", host_pointer_size());
        self.add_global_define_int("INT_SIZE", 4);
        self.add_global_define_int("LONG_SIZE", 8);
        self.add_global_define_int("BIG_ENDIAN", cfg!(target_endian = "big") as i64);
    }

    /// Register a predefined public compile-time integer constant on the
    /// std module.
    pub fn add_global_define_int(&mut self, name: &str, value: i64) {
        let name = self.intern(name);
        let expr = self.expr_arena.alloc(Expr {
            kind: ExprKind::IntConst(value as u64),
            loc: TokenId::NONE,
        });
        let decl_id = self.decl_arena.alloc(Decl {
            name,
            kind: DeclKind::Var {
                is_const: true,
                type_info: None,
                init: Some(expr),
                const_value: Some(value),
            },
            visibility: Visibility::Public,
            module: self.std_module,
            resolve_status: ResolveStatus::Done,
            ..Decl::default()
        });
        self.register_public_symbol(decl_id);
        let module = self.modules.deref_mut(self.std_module);
        module.public_symbols.set(name, decl_id);
        module.symbols.set(name, decl_id);
        module.decls.push(decl_id);
    }

    // ------------------------------------------------------------------
    // Arena lifecycle
    // ------------------------------------------------------------------

    /// Front-end memory statistics, printed before codegen.
    pub fn print_front_end_stats(&self) {
        println!("-- AST/EXPR INFO --");
        println!(" * Ast memory use: {}kb", self.ast_arena.bytes_allocated() / 1024);
        println!(" * Decl memory use: {}kb", self.decl_arena.bytes_allocated() / 1024);
        println!(" * Expr memory use: {}kb", self.expr_arena.bytes_allocated() / 1024);
        println!(
            " * TypeInfo memory use: {}kb",
            self.type_info_arena.bytes_allocated() / 1024
        );
        println!(" * Token memory use: {}kb", self.toktype_arena.bytes_allocated() / 1024);
        println!(
            " * Sourceloc memory use: {}kb",
            self.sourceloc_arena.bytes_allocated() / 1024
        );
        println!(
            " * Token data memory use: {}kb",
            self.tokdata_arena.bytes_allocated() / 1024
        );
    }

    /// Release the front-end arenas once module IR has been generated.
    ///
    /// The token-type arena is retained until link; generated IR may still
    /// reference token types.
    pub fn free_front_end_arenas(&mut self) {
        self.ast_arena.free_all();
        self.decl_arena.free_all();
        self.expr_arena.free_all();
        self.type_info_arena.free_all();
        self.sourceloc_arena.free_all();
        self.tokdata_arena.free_all();
    }

    /// Release whatever remains before exit.
    pub fn free_remaining_arenas(&mut self) {
        if !self.toktype_arena.is_freed() {
            self.toktype_arena.free_all();
        }
    }
}

fn host_pointer_size() -> i64 {
    if cfg!(target_pointer_width = "32") {
        4
    } else {
        8
    }
}

/// Platform search for the standard-library directory: walk up from the
/// current directory looking for `lib/std`.
fn find_lib_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut dir: &Path = &cwd;
    loop {
        let candidate = dir.join("lib").join("std");
        if candidate.is_dir() {
            return Some(dir.join("lib"));
        }
        dir = dir.parent()?;
    }
}
