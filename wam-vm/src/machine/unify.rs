//! Dereference, bind and unify (spec.md §4.4 "Dereference"/"Bind"/"Unify").

use wam_types::Addr;

use crate::error::{ResourceArea, RuntimeError};
use crate::heap::Cell;

use super::Machine;

impl Machine {
    /// Follow a chain of `REF` cells starting at `addr`, stopping at the
    /// first self-referential (unbound) or non-`REF` cell (spec.md §4.4
    /// "Dereference"). Idempotent: `deref(deref(a)) == deref(a)` for every
    /// reachable address (spec.md §8 "Deref idempotence"), since the loop
    /// only stops once further following would not move.
    pub(crate) fn deref_addr(&self, addr: Addr) -> Addr {
        let mut at = addr;
        loop {
            match self.heap[at as usize] {
                Cell::Ref(target) if target != at => at = target,
                _ => return at,
            }
        }
    }

    /// Resolve a cell value (typically a register or `Yₙ` slot's content) to
    /// its dereferenced form: follows the chain if it is a `Ref` pointing
    /// elsewhere, otherwise returns it unchanged (registers may hold a
    /// non-`Ref` value directly, e.g. a bare `Con` from `put_const`, with no
    /// heap address of their own — spec.md §3 "A constant is either a `CON`
    /// cell inline, or a 0-arity structure").
    pub(crate) fn deref_cell(&self, cell: Cell) -> Cell {
        match cell {
            Cell::Ref(addr) => {
                let at = self.deref_addr(addr);
                self.heap[at as usize]
            }
            other => other,
        }
    }

    /// Make the unbound variable at `addr` point at `target` (a fully
    /// dereferenced cell), trailing the binding if it predates the most
    /// recent choice point (spec.md §4.4 "Bind"). When both sides of a
    /// unification are unbound, the caller passes the *older* address here
    /// and the younger's `Cell::Ref` as `target`, preserving invariant 2 (no
    /// forward `REF`s except self-loops).
    pub(crate) fn bind(&mut self, addr: Addr, target: Cell) -> Result<(), RuntimeError> {
        self.heap[addr as usize] = target;
        if addr <= self.hb {
            self.push_trail(addr)?;
        }
        Ok(())
    }

    /// Unify two (not necessarily dereferenced) cell values, via the PDL
    /// (spec.md §4.4 "Unify"). `true` on success; bindings already made
    /// before a failure are left in place — the caller is expected to drive
    /// `BACKTRACK`, which unwinds the trail back past them (spec.md §4.4
    /// "On FAIL, trigger backtracking").
    pub(crate) fn unify(&mut self, a: Cell, b: Cell) -> Result<bool, RuntimeError> {
        self.pdl.clear();
        self.push_pdl(a, b)?;
        while let Some((x, y)) = self.pdl.pop() {
            let x = self.deref_cell(x);
            let y = self.deref_cell(y);
            if x == y {
                continue;
            }
            match (x, y) {
                // Both unbound: bind the younger (larger heap address, bound
                // later in the run) to the older, never the reverse, so every
                // `REF` chain still only ever points backward (spec.md §3
                // invariant 2).
                (Cell::Ref(ax), Cell::Ref(ay)) => {
                    if ax <= ay {
                        self.bind(ay, x)?
                    } else {
                        self.bind(ax, y)?
                    }
                }
                (Cell::Ref(ax), _) => self.bind(ax, y)?,
                (_, Cell::Ref(ay)) => self.bind(ay, x)?,
                (Cell::Con(na), Cell::Con(nb)) => {
                    if na != nb {
                        return Ok(false);
                    }
                }
                (Cell::Str(sa), Cell::Str(sb)) => {
                    let (fa, fb) = (self.heap[sa as usize], self.heap[sb as usize]);
                    match (fa, fb) {
                        (Cell::Functor(f1), Cell::Functor(f2)) if f1 == f2 => {
                            for i in 1..=(f1.arity() as Addr) {
                                self.push_pdl(self.heap[(sa + i) as usize], self.heap[(sb + i) as usize])?;
                            }
                        }
                        _ => return Ok(false),
                    }
                }
                (Cell::Lis(la), Cell::Lis(lb)) => {
                    self.push_pdl(self.heap[la as usize], self.heap[lb as usize])?;
                    self.push_pdl(self.heap[(la + 1) as usize], self.heap[(lb + 1) as usize])?;
                }
                // A 0-arity structure also counts as a constant (spec.md §3:
                // "both must be accepted").
                (Cell::Con(n), Cell::Str(s)) | (Cell::Str(s), Cell::Con(n)) => {
                    if let Cell::Functor(f) = self.heap[s as usize] {
                        if f.arity() != 0 || f.name() != n {
                            return Ok(false);
                        }
                    } else {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn push_pdl(&mut self, a: Cell, b: Cell) -> Result<(), RuntimeError> {
        if self.pdl.len() >= self.config.pdl_size {
            return Err(RuntimeError::ResourceExhausted { area: ResourceArea::Pdl, capacity: self.config.pdl_size });
        }
        self.pdl.push((a, b));
        Ok(())
    }
}

/// A fresh unbound `Ref` cell, self-pointing at `addr` (spec.md §3 invariant
/// 2: "self-referential (unbound)").
pub(crate) fn unbound_at(addr: Addr) -> Cell {
    Cell::Ref(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Linker;
    use quickcheck_macros::quickcheck;

    fn fresh_machine() -> Machine {
        Machine::new(Linker::new().link().unwrap())
    }

    #[test]
    fn deref_follows_a_bound_chain_to_its_final_value() {
        let mut m = fresh_machine();
        m.heap.extend([Cell::Ref(0), Cell::Ref(1), Cell::Con(42)]);
        m.h = 3;
        m.bind(1, Cell::Ref(2)).unwrap();
        m.bind(0, Cell::Ref(1)).unwrap();
        assert_eq!(m.deref_addr(0), 2);
        assert_eq!(m.deref_cell(Cell::Ref(0)), Cell::Con(42));
    }

    /// spec.md §8 "Deref idempotence".
    #[quickcheck]
    fn deref_is_idempotent(raw_len: u8) -> bool {
        let len = (raw_len % 16) as usize + 1;
        let mut m = fresh_machine();
        for i in 0..len {
            m.heap.push(Cell::Ref(i as Addr));
        }
        m.h = len as Addr;
        for i in (0..len - 1).rev() {
            m.bind(i as Addr, Cell::Ref((i + 1) as Addr)).unwrap();
        }
        let once = m.deref_addr(0);
        once == m.deref_addr(once)
    }

    /// spec.md §8 "Bind symmetry": `bind(a, b)` makes `a` and `b` dereference
    /// to the same place.
    #[quickcheck]
    fn bind_makes_both_sides_deref_equal(raw_len: u8) -> bool {
        let len = (raw_len % 16) as usize + 2;
        let mut m = fresh_machine();
        for i in 0..len {
            m.heap.push(Cell::Ref(i as Addr));
        }
        m.h = len as Addr;
        let (a, b) = (0 as Addr, (len - 1) as Addr);
        m.bind(a, Cell::Ref(b)).unwrap();
        m.deref_addr(a) == m.deref_addr(b)
    }

    /// spec.md §8 "Unify symmetry", restricted to the constant/constant case
    /// where no bindings are made and the result depends only on equality.
    #[quickcheck]
    fn unify_of_constants_is_symmetric(x: u32, y: u32) -> bool {
        let mut m = fresh_machine();
        let forward = m.unify(Cell::Con(x), Cell::Con(y)).unwrap();
        let mut m = fresh_machine();
        let backward = m.unify(Cell::Con(y), Cell::Con(x)).unwrap();
        forward == backward
    }
}
