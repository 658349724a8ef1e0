//! Canonicalizes identifier names to a single `Rc<str>` per distinct
//! spelling.
//!
//! A globals table keyed on pointer identity only works if every occurrence
//! of the same identifier text resolves to the same allocation, otherwise
//! two mentions of the same global look like two different names. This
//! gives every occurrence of a given spelling one canonical pointer.

use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct Interner {
    names: HashMap<Rc<str>, Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical handle for `name`, allocating one on first
    /// sight and reusing it on every later call with the same text.
    pub fn intern(&mut self, name: &str) -> Rc<str> {
        if let Some(existing) = self.names.get(name) {
            return Rc::clone(existing);
        }
        let handle: Rc<str> = Rc::from(name);
        self.names.insert(Rc::clone(&handle), Rc::clone(&handle));
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn repeated_names_share_one_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("counter");
        let b = interner.intern("counter");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_names_stay_distinct() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert!(!Rc::ptr_eq(&a, &b));
    }
}
