//! String interner for identifier storage.
//!
//! The [`Interner`] deduplicates strings and assigns each unique string a
//! [`Name`] handle. Two interned strings are equal iff their handles are
//! equal, so every identifier comparison in the compiler is an integer
//! comparison.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// An interned string handle.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default, Serialize)]
pub struct Name(pub u32);

impl Name {
    /// The empty string, interned at index 0 on construction. Used as the
    /// "no name" value in zero-initialized records.
    pub const EMPTY: Name = Name(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A reference-counted string wrapper.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArcStr(Arc<String>);

impl fmt::Display for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", &*self.0)
    }
}

impl fmt::Debug for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", &*self.0)
    }
}

impl ArcStr {
    fn new(value: String) -> ArcStr {
        ArcStr(Arc::new(value))
    }
}

impl Borrow<str> for ArcStr {
    fn borrow(&self) -> &str {
        &self.0[..]
    }
}

impl Deref for ArcStr {
    type Target = String;

    fn deref(&self) -> &String {
        &self.0
    }
}

#[derive(Debug)]
struct Internal {
    map: FxHashMap<ArcStr, Name>,
    vec: Vec<ArcStr>,
}

/// A thread-safe string interner.
#[derive(Debug)]
pub struct Interner {
    data: Mutex<Internal>,
}

impl Interner {
    /// Create an interner pre-sized for `capacity` entries.
    ///
    /// The empty string is interned eagerly so that [`Name::EMPTY`] is
    /// always valid.
    pub fn with_capacity(capacity: usize) -> Interner {
        let interner = Interner {
            data: Mutex::new(Internal {
                map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
                vec: Vec::with_capacity(capacity),
            }),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    /// Intern a string, returning its unique [`Name`].
    pub fn intern(&self, name: &str) -> Name {
        let mut data = self.data.lock();

        if let Some(&val) = data.map.get(name) {
            return val;
        }

        let key = ArcStr::new(String::from(name));
        let value = Name(data.vec.len() as u32);

        data.vec.push(key.clone());
        data.map.insert(key, value);

        value
    }

    /// Get the string for a previously interned [`Name`].
    pub fn str(&self, name: Name) -> ArcStr {
        let data = self.data.lock();
        data.vec[name.index()].clone()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}
