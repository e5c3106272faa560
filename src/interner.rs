//! String interner.
//!
//! Symbols are interned in a thread-local table so they can be minted from
//! anywhere in the evaluator (type tags, comparison results, symbol
//! concatenation) without threading an interner handle through every
//! object-protocol call. The evaluator is single-threaded by design.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Stores all known symbols.
#[derive(Debug)]
pub struct Interner(HashSet<Symbol>);

impl Interner {
    pub fn new() -> Interner {
        Interner(HashSet::new())
    }

    /// Maps a string to a symbol.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.0.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            self.0.insert(sym.clone());
            sym
        }
    }
}

thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::new());
}

/// An immutable string that is guaranteed to be unique and so can be compared
/// by address rather than content.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Interns `name` if needed and returns its symbol.
    pub fn intern(name: &str) -> Symbol {
        INTERNER.with(|i| i.borrow_mut().symbol(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ptr() == other.0.as_ptr()
    }
}

impl Eq for Symbol {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_string() {
        let sym = Symbol::intern("foo");
        assert_eq!(sym.name(), "foo");
    }

    #[test]
    fn symbols_with_same_name_are_equal() {
        let sym1 = Symbol::intern("foo");
        let sym2 = Symbol::intern("foo");
        assert_eq!(sym1, sym2);
    }

    #[test]
    fn symbols_with_different_names_are_different() {
        let sym1 = Symbol::intern("foo");
        let sym2 = Symbol::intern("bar");
        assert_ne!(sym1, sym2);
    }

    #[test]
    fn cloned_symbol_compares_equal() {
        let sym = Symbol::intern("baz");
        assert_eq!(sym.clone(), sym);
    }
}
