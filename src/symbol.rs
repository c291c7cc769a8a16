//! Interned identifiers.
//!
//! Every name the core deals with (type constructors, type variables, local
//! captures, record fields, argument placeholders) is interned once into a
//! [`StringInterner`] and passed around as a copyable [`Symbol`]. Comparing
//! two symbols is a single integer comparison, which matters for the unifier
//! since constructor equality is purely nominal.

use string_interner::{self, backend, symbol};

/// The initial capacity of a [`StringInterner`].
///
/// A single matcher rarely introduces more than a few dozen names, but the
/// interner is shared by every matcher in a compilation unit.
const INTERNER_CAPACITY: usize = 256;

/// The text shown for a symbol that does not belong to the interner it is
/// being resolved against.
const UNKNOWN_SYMBOL: &str = "<?>";

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(symbol::SymbolU32);

#[derive(Debug)]
pub struct StringInterner(
    string_interner::StringInterner<backend::StringBackend<symbol::SymbolU32>>,
);

impl StringInterner {
    pub fn new() -> Self {
        StringInterner(string_interner::StringInterner::with_capacity(
            INTERNER_CAPACITY,
        ))
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        Symbol(self.0.get_or_intern(s))
    }

    pub fn intern_static(&mut self, s: &'static str) -> Symbol {
        Symbol(self.0.get_or_intern_static(s))
    }

    /// Returns the symbol for `s` without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.0.get(s).map(Symbol)
    }

    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.0.resolve(sym.0)
    }

    /// Like [`StringInterner::resolve`], but falls back to a placeholder for
    /// foreign symbols. Only used when rendering.
    pub fn display(&self, sym: Symbol) -> &str {
        self.resolve(sym).unwrap_or(UNKNOWN_SYMBOL)
    }

    /// Interns `{prefix}{index}`, e.g. `t3` or `_0`.
    pub fn intern_indexed(&mut self, prefix: &str, index: usize) -> Symbol {
        self.intern(&format!("{prefix}{index}"))
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
