//! Solution iterator and term decoder (spec.md §6 `run(query)`/`decode`, §9
//! "iterators over solutions are modeled as a pull-based generator",
//! SPEC_FULL.md §4 "a solution iterator that supports full re-enumeration").

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use wam_types::{Addr, VarId};

use super::{ExecState, Machine};
use crate::error::RuntimeError;
use crate::heap::Cell;
use crate::term::Term;

/// One query solution: the binding each free query variable received,
/// decoded back into a [`Term`] (spec.md §6 "a map from named query
/// variables to decoded terms").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub bindings: BTreeMap<VarId, Term>,
}

impl Solution {
    pub fn get(&self, var: VarId) -> Option<&Term> {
        self.bindings.get(&var)
    }
}

/// Pull-based iterator over a query's solutions (spec.md §4.4 "State machine
/// of the execution loop": "After reporting a success, driving the engine
/// into `BACKTRACK` must enumerate the next solution").
///
/// Built by [`Machine::run`]; borrows the machine for its lifetime since a
/// machine runs one query at a time (spec.md §5 "Scheduling model").
pub struct Solutions<'m> {
    machine: &'m mut Machine,
    var_slots: Vec<VarId>,
    /// `false` before the first [`Iterator::next`] call: the initial run
    /// starts from `P` as set by `Machine::run` with no prior choice point to
    /// backtrack into. Every later call must first backtrack past the choice
    /// point that produced the previous solution before resuming search.
    started: bool,
    done: bool,
}

impl<'m> Solutions<'m> {
    pub(crate) fn new(machine: &'m mut Machine, var_slots: Vec<VarId>) -> Self {
        Self { machine, var_slots, started: false, done: false }
    }

    /// Read the current query environment's permanent slots back into a
    /// [`Solution`], in the order [`crate::compiler::place_query`] returned
    /// the query's free variables (spec.md §4.2 rule 4 "permanent variables
    /// are allocated Y-slots ... in order of first occurrence"). The query's
    /// own environment frame is always the first one ever pushed by a fresh
    /// `run` — it is allocated before any choice point exists and, unlike a
    /// called predicate's frame, is never deallocated by the compiled query
    /// body — so it is always found at environment-stack index 0 (see
    /// `DESIGN.md`).
    fn decode_solution(&self) -> Solution {
        let mut bindings = BTreeMap::new();
        if !self.var_slots.is_empty() {
            let frame = &self.machine.env_stack[0];
            for (i, var) in self.var_slots.iter().enumerate() {
                let cell = self.machine.deref_cell(frame.slots[i]);
                bindings.insert(*var, self.machine.decode_cell(cell));
            }
        }
        Solution { bindings }
    }
}

impl<'m> Iterator for Solutions<'m> {
    type Item = Result<Solution, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started {
            if !self.machine.backtrack() {
                self.done = true;
                return None;
            }
        }
        self.started = true;
        loop {
            match self.machine.step() {
                Ok(ExecState::Run) => continue,
                Ok(ExecState::HaltSuccess) => return Some(Ok(self.decode_solution())),
                Ok(ExecState::Backtrack) => {
                    if !self.machine.backtrack() {
                        self.done = true;
                        return None;
                    }
                }
                Ok(ExecState::HaltFail) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl Machine {
    /// Reconstruct a [`Term`] from the heap, following `STR`/`LIS`/`REF`/
    /// `CON` tags (spec.md §6 `decode(heap_address) -> Term`).
    pub fn decode(&self, addr: Addr) -> Term {
        let at = self.deref_addr(addr);
        self.decode_cell(self.heap[at as usize])
    }

    /// Decode an already-dereferenced cell. An unbound `Ref` has no source
    /// variable name once compiled (spec.md §4.1: interning is an external
    /// boundary the core does not retain past compilation) — it decodes to a
    /// [`Term::Var`] keyed by its own heap address, which is stable and
    /// unique for the lifetime of one query, and is the representation the
    /// `decode` contract asks for: a self-consistent term, not a source-text
    /// round-trip (see `DESIGN.md`).
    pub(crate) fn decode_cell(&self, cell: Cell) -> Term {
        match cell {
            Cell::Ref(a) => Term::Var(a),
            Cell::Con(n) => {
                if n == crate::compiler::emit::NIL {
                    Term::Nil
                } else {
                    Term::atom(n)
                }
            }
            Cell::Str(s) => match self.heap[s as usize] {
                Cell::Functor(f) => {
                    let args = (1..=f.arity() as Addr).map(|i| self.decode(s + i)).collect();
                    Term::compound(f.name(), args)
                }
                other => panic!("STR cell at {s} did not point at a functor descriptor, found {other:?}"),
            },
            Cell::Lis(l) => Term::cons(self.decode(l), self.decode(l + 1)),
            Cell::Functor(_) | Cell::Barrier(_) => {
                panic!("attempted to decode a non-term heap cell: {cell:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile_predicate_def, place_query_goal};
    use crate::linker::Linker;
    use crate::term::RawGoal;

    const P: u32 = 100;
    const A: u32 = 1;

    #[test]
    fn atom_query_succeeds_with_no_bindings() {
        let mut linker = Linker::new();
        compile_predicate_def(&mut linker, P, 0, Term::atom(P), None).unwrap();
        let (entry, vars) = place_query_goal(&mut linker, Some(RawGoal::Call(Term::atom(P))))
            .unwrap()
            .remove(0);
        let program = linker.link().unwrap();
        let mut machine = Machine::new(program);
        let mut solutions = machine.run(entry, vars);
        let sol = solutions.next().unwrap().unwrap();
        assert!(sol.bindings.is_empty());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn variable_binding_decodes_the_bound_atom() {
        let mut linker = Linker::new();
        // p(a).
        compile_predicate_def(
            &mut linker,
            P,
            1,
            Term::compound(P, alloc::vec![Term::atom(A)]),
            None,
        )
        .unwrap();
        let x = 0;
        let (entry, vars) = place_query_goal(
            &mut linker,
            Some(RawGoal::Call(Term::compound(P, alloc::vec![Term::Var(x)]))),
        )
        .unwrap()
        .remove(0);
        let program = linker.link().unwrap();
        let mut machine = Machine::new(program);
        let mut solutions = machine.run(entry, vars);
        let sol = solutions.next().unwrap().unwrap();
        assert_eq!(sol.get(x), Some(&Term::atom(A)));
        assert!(solutions.next().is_none());
    }
}
