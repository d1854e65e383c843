//! String interner for identifiers.
//!
//! Every name in the tree is a [`Symbol`]: a dense `u32` handle into an
//! append-only table. Equality and hashing are integer operations, and the
//! original text is recovered with [`Interner::resolve`].

use rustc_hash::FxHashMap;

/// Handle to an interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub const INT: Symbol = Symbol(0);
    pub const UNSIGNED: Symbol = Symbol(1);
    pub const FLOAT: Symbol = Symbol(2);
    pub const BOOL: Symbol = Symbol(3);
    pub const STRING: Symbol = Symbol(4);
    pub const ARRAY: Symbol = Symbol(5);
    pub const SET: Symbol = Symbol(6);

    /// Builtin type names, in slot order.
    pub const BUILTINS: [Symbol; 7] = [
        Symbol::INT,
        Symbol::UNSIGNED,
        Symbol::FLOAT,
        Symbol::BOOL,
        Symbol::STRING,
        Symbol::ARRAY,
        Symbol::SET,
    ];

    const BUILTIN_NAMES: [&'static str; 7] =
        ["Int", "Unsigned", "Float", "Bool", "String", "Array", "Set"];

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `Int`, `Unsigned`, `Float`, `Bool` or `String`.
    pub fn is_scalar_type(self) -> bool {
        self.0 <= Symbol::STRING.0
    }

    /// `Array` or `Set`.
    pub fn is_collection_type(self) -> bool {
        self == Symbol::ARRAY || self == Symbol::SET
    }

    pub fn is_builtin(self) -> bool {
        self.0 <= Symbol::SET.0
    }
}

/// Append-only symbol table.
///
/// Created once per compilation and passed by reference to every stage.
#[derive(Clone, Debug)]
pub struct Interner {
    map: FxHashMap<Box<str>, Symbol>,
    strings: Vec<Box<str>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        for (expected, name) in Symbol::BUILTINS.iter().zip(Symbol::BUILTIN_NAMES) {
            let sym = interner.intern(name);
            debug_assert_eq!(sym, *expected);
        }
        interner
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.map.get(text) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let owned: Box<str> = text.into();
        self.strings.push(owned.clone());
        self.map.insert(owned, sym);
        sym
    }

    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.map.get(text).copied()
    }

    /// Text of `sym`.
    ///
    /// Symbols are only ever produced by this table, so an unknown handle
    /// means it came from a different interner; it renders as `<?>`.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings.get(sym.index()).map(|s| &**s).unwrap_or("<?>")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_have_fixed_slots() {
        let interner = Interner::new();
        assert_eq!(interner.get("Int"), Some(Symbol::INT));
        assert_eq!(interner.get("Unsigned"), Some(Symbol::UNSIGNED));
        assert_eq!(interner.get("Set"), Some(Symbol::SET));
        assert_eq!(interner.resolve(Symbol::ARRAY), "Array");
        assert_eq!(interner.len(), 7);
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("List");
        let b = interner.intern("List");
        let c = interner.intern("Nil");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(c), "Nil");
        assert!(!a.is_builtin());
    }

    #[test]
    fn test_builtin_classification() {
        assert!(Symbol::BOOL.is_scalar_type());
        assert!(!Symbol::ARRAY.is_scalar_type());
        assert!(Symbol::SET.is_collection_type());
        assert!(Symbol::STRING.is_builtin());
    }
}
