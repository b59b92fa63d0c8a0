//! C3 compiler core.
//!
//! This crate implements the compilation driver for the C3 language:
//! - Arena-allocated front end with 32-bit index handles
//! - A global context holding interner, symbol tables and module registry
//! - Staged semantic analysis with monotonic per-module progression
//! - Parallel per-module object emission feeding a link step
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         GlobalContext                            │
//! │  ┌──────────┐ ┌─────────┐ ┌──────────────┐ ┌─────────────────┐  │
//! │  │ Interner │ │ Arenas  │ │ Module       │ │ Global/qualified│  │
//! │  │ (names)  │ │ (ids)   │ │ registry     │ │ symbol tables   │  │
//! │  └──────────┘ └─────────┘ └──────────────┘ └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//!        ↑              ↑               ↑
//!   ┌────┴───┐    ┌─────┴─────┐   ┌─────┴─────┐   ┌──────────────┐
//!   │ Parse  │ →  │  Staged   │ → │  Codegen  │ → │ Link / run   │
//!   │        │    │  analysis │   │  fan-out  │   │              │
//!   └────────┘    └───────────┘   └───────────┘   └──────────────┘
//! ```
//!
//! The analysis scheduler raises the target stage one step at a time
//! across the whole module list, so every module completes a stage before
//! any module enters the next one. Object emission runs one worker thread
//! per module codegen context after the front-end arenas are freed.

pub mod arena;
pub mod codegen;
pub mod compiler;
pub mod context;
pub mod decl;
pub mod diagnostic;
pub mod ids;
pub mod interner;
pub mod module;
pub mod sema;
pub mod source;
pub mod symtab;
pub mod syntax;
pub mod target;

pub use compiler::{CompileError, CompileResult, Compiler};
pub use context::{GlobalContext, MAX_STRING_BUFFER};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use ids::{AstId, DeclId, ExprId, ModuleId, TokenId, TypeInfoId};
pub use interner::{Interner, Name};
pub use module::AnalysisStage;
pub use symtab::{GlobalSymbol, SymbolTable};
pub use target::{ArchOsTarget, BuildTarget, TargetType};
