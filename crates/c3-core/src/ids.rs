//! Integer handles for arena-allocated compiler data.
//!
//! Every front-end record lives in a typed arena and is referred to by a
//! small index handle instead of a reference. This keeps handles at 32 bits
//! and lets the whole front end be released in one sweep between analysis
//! and object emission.

use serde::Serialize;
use std::fmt;

/// Handle into the AST statement arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct AstId(pub u32);

impl AstId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ast#{}", self.0)
    }
}

/// Handle into the expression arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expr#{}", self.0)
    }
}

/// Handle into the declaration arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// Handle into the type-info arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct TypeInfoId(pub u32);

impl TypeInfoId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeInfoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Handle for one lexical token.
///
/// The token-type, token-data and source-location arenas are parallel:
/// a single `TokenId` indexes all three. Handle 0 is the reserved "no
/// token" sentinel, discarded in each of the three arenas at context
/// initialization.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct TokenId(pub u32);

impl TokenId {
    /// The reserved sentinel handle.
    pub const NONE: TokenId = TokenId(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tok#{}", self.0)
    }
}

/// Handle into the module store.
///
/// Modules are never destroyed before process exit, so this handle is
/// valid for the whole compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sentinel() {
        assert!(TokenId::NONE.is_none());
        assert!(!TokenId::new(1).is_none());
    }

    #[test]
    fn test_handle_roundtrip() {
        let id = DeclId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "decl#42");
    }
}
