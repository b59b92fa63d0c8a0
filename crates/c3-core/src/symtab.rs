//! Symbol tables keyed by interned names.
//!
//! Used for the module registry, the global unqualified table, the
//! per-module-path qualified namespaces, and each module's local and public
//! tables. Keys are [`Name`] handles, so lookup never touches string data.

use crate::ids::DeclId;
use crate::interner::Name;
use rustc_hash::FxHashMap;

/// Interned-name to value mapping with last-write-wins `set` semantics.
///
/// Not concurrent; all mutation happens on the driver thread.
#[derive(Debug, Clone)]
pub struct SymbolTable<V> {
    map: FxHashMap<Name, V>,
}

impl<V> SymbolTable<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn get(&self, key: Name) -> Option<&V> {
        self.map.get(&key)
    }

    /// Insert or overwrite the entry for `key`.
    pub fn set(&mut self, key: Name, value: V) {
        self.map.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Name, &V)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }
}

/// An entry in the global or qualified symbol tables.
///
/// [`GlobalSymbol::Poisoned`] means the name has multiple public
/// definitions; it is a visible but unusable entry, distinct from an
/// absent one. Any use site that resolves to it must report an
/// ambiguity diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalSymbol {
    Decl(DeclId),
    Poisoned,
}

impl GlobalSymbol {
    pub fn is_poisoned(self) -> bool {
        matches!(self, GlobalSymbol::Poisoned)
    }

    pub fn as_decl(self) -> Option<DeclId> {
        match self {
            GlobalSymbol::Decl(d) => Some(d),
            GlobalSymbol::Poisoned => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    #[test]
    fn test_last_write_wins() {
        let interner = Interner::with_capacity(8);
        let key = interner.intern("foo");

        let mut table: SymbolTable<u32> = SymbolTable::with_capacity(4);
        assert!(table.get(key).is_none());

        table.set(key, 1);
        assert_eq!(table.get(key), Some(&1));

        table.set(key, 2);
        assert_eq!(table.get(key), Some(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_poison_is_not_absent() {
        let interner = Interner::with_capacity(8);
        let key = interner.intern("dup");

        let mut table: SymbolTable<GlobalSymbol> = SymbolTable::with_capacity(4);
        table.set(key, GlobalSymbol::Poisoned);

        let entry = table.get(key).copied().unwrap();
        assert!(entry.is_poisoned());
        assert!(entry.as_decl().is_none());
    }
}
