//! Pre-compiler (spec.md §2 item 4, §4.6 step 2).
//!
//! Substitutes the built-in goals — conjunction, disjunction, cut — with
//! dedicated nodes: a [`RawGoal`] tree (what a caller/parser naturally
//! builds, with `,`/`;` as explicit tree shape rather than functors to
//! intern) is expanded into one or more flat [`Clause`]s, one per
//! disjunctive alternative, each holding a plain `Vec<Goal>` conjunction
//! the rest of the compiler pipeline consumes.

use alloc::{boxed::Box, vec, vec::Vec};

use crate::term::{Clause, Goal, RawGoal, Term};

/// Expand a clause whose body may contain disjunction into one [`Clause`]
/// per alternative (spec.md §4.6 step 2 "Pre-compile").
///
/// `p :- (A ; B), C` becomes two clauses: `p :- A, C.` and `p :- B, C.` —
/// each independently compiled, register-allocated and given its own entry
/// in the predicate's try/retry/trust chain (spec.md §4.3 "Predicate
/// compilation"), which is exactly how a WAM would realize in-clause
/// disjunction: as extra alternative clauses sharing the same head.
pub fn precompile(head: Term, body: Option<RawGoal>) -> Vec<Clause> {
    let alternatives = match body {
        None => vec![Vec::new()],
        Some(g) => flatten(&g),
    };
    alternatives.into_iter().map(|body| Clause { head: head.clone(), body }).collect()
}

/// Expand a raw goal tree into the set of flat conjunctive alternatives it
/// denotes (a goal tree with `k` disjunctions flattens to up to `2^k`
/// alternatives; in practice far fewer, since each `Disjunction` node
/// contributes its two branches additively, not multiplicatively, and only
/// `Conjunction` of two *already-disjunctive* subtrees multiplies them).
fn flatten(goal: &RawGoal) -> Vec<Vec<Goal>> {
    match goal {
        RawGoal::Cut => vec![vec![Goal::Cut]],
        RawGoal::Call(t) => vec![vec![Goal::Call(t.clone())]],
        RawGoal::Conjunction(a, b) => {
            let lefts = flatten(a);
            let rights = flatten(b);
            let mut out = Vec::with_capacity(lefts.len() * rights.len());
            for l in &lefts {
                for r in &rights {
                    let mut seq = l.clone();
                    seq.extend(r.iter().cloned());
                    out.push(seq);
                }
            }
            out
        }
        RawGoal::Disjunction(a, b) => {
            let mut out = flatten(a);
            out.extend(flatten(b));
            out
        }
    }
}

/// Flatten a top-level query goal tree the same way, with no head (spec.md
/// §6 "compile(clause_or_query)"). A disjunctive query expands to several
/// independent queries; callers wanting "any alternative" semantics should
/// run each in turn.
pub fn precompile_query(goal: Option<RawGoal>) -> Vec<Vec<Goal>> {
    match goal {
        None => vec![Vec::new()],
        Some(g) => flatten(&g),
    }
}

/// Convenience: build a [`RawGoal`] conjunction from a left-to-right goal
/// sequence, the shape a parser naturally produces for `a, b, c`.
pub fn conjoin(goals: Vec<RawGoal>) -> Option<RawGoal> {
    let mut iter = goals.into_iter().rev();
    let mut acc = iter.next()?;
    for g in iter {
        acc = RawGoal::Conjunction(Box::new(g), Box::new(acc));
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjunction_without_disjunction_yields_one_alternative() {
        let body = conjoin(vec![RawGoal::Call(Term::atom(1)), RawGoal::Cut, RawGoal::Call(Term::atom(2))]);
        let clauses = precompile(Term::atom(0), body);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].body.len(), 3);
    }

    #[test]
    fn disjunction_expands_into_alternative_clauses() {
        // p :- (a ; b), c.
        let body = RawGoal::Conjunction(
            Box::new(RawGoal::Disjunction(
                Box::new(RawGoal::Call(Term::atom(1))),
                Box::new(RawGoal::Call(Term::atom(2))),
            )),
            Box::new(RawGoal::Call(Term::atom(3))),
        );
        let clauses = precompile(Term::atom(0), Some(body));
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].body, vec![Goal::Call(Term::atom(1)), Goal::Call(Term::atom(3))]);
        assert_eq!(clauses[1].body, vec![Goal::Call(Term::atom(2)), Goal::Call(Term::atom(3))]);
    }
}
