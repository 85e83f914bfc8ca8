//! Symbol interner (spec.md §2 item 1, §4.1).
//!
//! Out of scope as a *concrete production policy* (spec.md §1 "Out of
//! scope"): the core only needs the `Interner` trait boundary. A
//! `BTreeMap`-backed reference implementation is provided — grounded the
//! way `fuel_tx`'s `ContractId`/`AssetId` newtypes wrap a plain map lookup —
//! so the crate is testable end-to-end without a caller-supplied interner.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use wam_types::{FunctorId, VarId};

/// Maps functor names (`name`+`arity`) and variable names to dense integer
/// ids, and inverts that mapping (spec.md §4.1).
///
/// Contract: deterministic and injective within one `Interner`'s lifetime —
/// interning the same `(name, arity)` (or the same variable name) twice
/// returns the same id. Ids fit in 24 bits, since a functor id shares a heap
/// cell's 24-bit value field with the arity byte (`FunctorRef::MAX_NAME`).
pub trait Interner {
    fn intern_functor(&mut self, name: &str, arity: u8) -> FunctorId;
    fn intern_var(&mut self, name: &str) -> VarId;
    fn deintern_functor(&self, id: FunctorId) -> Option<(&str, u8)>;
    fn deintern_var(&self, id: VarId) -> Option<&str>;
}

/// In-memory reference implementation of [`Interner`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    functors: Vec<(String, u8)>,
    functor_ids: BTreeMap<(String, u8), FunctorId>,
    vars: Vec<String>,
    var_ids: BTreeMap<String, VarId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interner for SymbolTable {
    fn intern_functor(&mut self, name: &str, arity: u8) -> FunctorId {
        let key = (String::from(name), arity);
        if let Some(id) = self.functor_ids.get(&key) {
            return *id;
        }
        let id = self.functors.len() as FunctorId;
        self.functors.push(key.clone());
        self.functor_ids.insert(key, id);
        id
    }

    fn intern_var(&mut self, name: &str) -> VarId {
        if let Some(id) = self.var_ids.get(name) {
            return *id;
        }
        let id = self.vars.len() as VarId;
        self.vars.push(String::from(name));
        self.var_ids.insert(String::from(name), id);
        id
    }

    fn deintern_functor(&self, id: FunctorId) -> Option<(&str, u8)> {
        self.functors.get(id as usize).map(|(n, a)| (n.as_str(), *a))
    }

    fn deintern_var(&self, id: VarId) -> Option<&str> {
        self.vars.get(id as usize).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_injective_and_deterministic() {
        let mut t = SymbolTable::new();
        let a1 = t.intern_functor("foo", 2);
        let a2 = t.intern_functor("foo", 2);
        let b = t.intern_functor("foo", 3);
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(t.deintern_functor(a1), Some(("foo", 2)));
        assert_eq!(t.deintern_functor(b), Some(("foo", 3)));
    }

    #[test]
    fn var_interning_round_trips() {
        let mut t = SymbolTable::new();
        let x = t.intern_var("X");
        let y = t.intern_var("Y");
        assert_ne!(x, y);
        assert_eq!(t.deintern_var(x), Some("X"));
        assert_eq!(t.intern_var("X"), x);
    }
}
