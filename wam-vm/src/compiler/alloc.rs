//! Register/permanent-variable allocator (spec.md §4.2).
//!
//! This pass only decides *which variables are permanent* (live across more
//! than one body goal, counting the head as goal 0) and assigns their `Y`
//! slots in first-occurrence order (rule 4). Temporary `X` register
//! numbering (rule 3's breadth-first counter) is assigned on the fly, one
//! goal at a time, by [`crate::compiler::emit`]'s [`GoalRegs`] helper: since
//! a non-permanent variable is — by the permanence rule itself — live within
//! exactly one goal window, numbering it against a counter that resets per
//! goal is observationally identical to a single clause-wide counter (no two
//! live ranges that reuse the same number ever overlap), and is far simpler
//! to implement correctly. This simplification is recorded in `DESIGN.md`.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use wam_types::{RegIndex, VarId};

use crate::term::{Clause, Goal, Term};

/// Per-clause permanent-variable allocation (spec.md §4.2 rule 4).
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    /// `Y` slot (1-based) for each permanent variable.
    pub perm_slot: BTreeMap<VarId, RegIndex>,
    /// Permanent variables in `Y`-slot assignment order (first occurrence
    /// across the whole clause).
    pub permanent_order: Vec<VarId>,
    /// Highest goal index (`0` = head, `1..` = body goals) at which each
    /// variable occurs, used to compute the `k` (permanent-vars-remaining)
    /// operand of `call` and to decide environment trimming.
    pub last_goal_index: BTreeMap<VarId, usize>,
    /// Total number of textual occurrences of each variable across the
    /// whole clause. A variable occurring exactly once, in a nested (not
    /// top-level-argument) position, compiles to `set_void`/`unify_void`
    /// rather than a named register (spec.md §4.3 "Set"/"Unify" families) —
    /// the peephole pass then merges adjacent voids (SPEC_FULL.md §4).
    pub total_occurrences: BTreeMap<VarId, usize>,
}

impl Allocation {
    pub fn perm_count(&self) -> u8 {
        self.permanent_order.len() as u8
    }

    /// `true` if `v` occurs exactly once in the entire clause (head + body),
    /// making it safe to compile as an anonymous/void slot wherever it is
    /// not itself a top-level argument.
    pub fn is_singleton(&self, v: VarId) -> bool {
        self.total_occurrences.get(&v) == Some(&1)
    }

    pub fn is_permanent(&self, v: VarId) -> bool {
        self.perm_slot.contains_key(&v)
    }

    /// Number of permanent variables whose last occurrence is strictly after
    /// `goal_index` — the trim count `k` to emit on the `call`/`execute`
    /// that ends goal `goal_index` (spec.md §4.3 "Query emission", `call
    /// f/n, k`).
    pub fn remaining_after(&self, goal_index: usize) -> u8 {
        self.last_goal_index
            .values()
            .filter(|&&last| last > goal_index)
            .count() as u8
    }
}

/// Run the allocator over one clause (spec.md §4.2 "Input: one clause").
pub fn allocate(clause: &Clause) -> Allocation {
    let mut goals_of: BTreeMap<VarId, BTreeSet<usize>> = BTreeMap::new();
    let mut first_occurrence: Vec<VarId> = Vec::new();
    let mut seen: BTreeSet<VarId> = BTreeSet::new();
    let mut total_occurrences: BTreeMap<VarId, usize> = BTreeMap::new();

    collect_vars(&clause.head, 0, &mut goals_of, &mut first_occurrence, &mut seen, &mut total_occurrences);
    for (gi, goal) in clause.body.iter().enumerate() {
        if let Goal::Call(t) = goal {
            collect_vars(t, gi + 1, &mut goals_of, &mut first_occurrence, &mut seen, &mut total_occurrences);
        }
    }

    let permanent: BTreeSet<VarId> =
        goals_of.iter().filter(|(_, gs)| gs.len() > 1).map(|(v, _)| *v).collect();

    let mut perm_slot = BTreeMap::new();
    let mut permanent_order = Vec::new();
    let mut next_slot: RegIndex = 1;
    for v in &first_occurrence {
        if permanent.contains(v) {
            perm_slot.insert(*v, next_slot);
            permanent_order.push(*v);
            next_slot += 1;
        }
    }

    let last_goal_index = goals_of
        .into_iter()
        .map(|(v, gs)| (v, gs.into_iter().max().expect("non-empty by construction")))
        .collect();

    Allocation { perm_slot, permanent_order, last_goal_index, total_occurrences }
}

fn collect_vars(
    term: &Term,
    goal_index: usize,
    goals_of: &mut BTreeMap<VarId, BTreeSet<usize>>,
    first_occurrence: &mut Vec<VarId>,
    seen: &mut BTreeSet<VarId>,
    total_occurrences: &mut BTreeMap<VarId, usize>,
) {
    match term {
        Term::Var(v) => {
            goals_of.entry(*v).or_default().insert(goal_index);
            *total_occurrences.entry(*v).or_insert(0) += 1;
            if seen.insert(*v) {
                first_occurrence.push(*v);
            }
        }
        Term::Functor { args, .. } => {
            for a in args {
                collect_vars(a, goal_index, goals_of, first_occurrence, seen, total_occurrences);
            }
        }
        Term::Cons(h, t) => {
            collect_vars(h, goal_index, goals_of, first_occurrence, seen, total_occurrences);
            collect_vars(t, goal_index, goals_of, first_occurrence, seen, total_occurrences);
        }
        Term::Nil => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Clause;

    #[test]
    fn variable_occurring_in_two_goals_is_permanent() {
        // p(X, Y) :- q(X, Z), r(Z, Y).
        let x = 0;
        let y = 1;
        let z = 2;
        let head = Term::compound(100, alloc::vec![Term::Var(x), Term::Var(y)]);
        let body = alloc::vec![
            Goal::Call(Term::compound(101, alloc::vec![Term::Var(x), Term::Var(z)])),
            Goal::Call(Term::compound(102, alloc::vec![Term::Var(z), Term::Var(y)])),
        ];
        let clause = Clause { head, body };
        let a = allocate(&clause);
        // X: head(0) + goal1 -> permanent. Y: head(0) + goal2 -> permanent.
        // Z: goal1 + goal2 -> permanent. All three are permanent here.
        assert!(a.is_permanent(x));
        assert!(a.is_permanent(y));
        assert!(a.is_permanent(z));
        assert_eq!(a.permanent_order.len(), 3);
    }

    #[test]
    fn singly_occurring_variable_is_not_permanent() {
        // p(X) :- q(X, Local).
        let x = 0;
        let local = 1;
        let head = Term::compound(100, alloc::vec![Term::Var(x)]);
        let body = alloc::vec![Goal::Call(Term::compound(
            101,
            alloc::vec![Term::Var(x), Term::Var(local)]
        ))];
        let clause = Clause { head, body };
        let a = allocate(&clause);
        assert!(a.is_permanent(x)); // head + goal1
        assert!(!a.is_permanent(local)); // goal1 only
    }
}
