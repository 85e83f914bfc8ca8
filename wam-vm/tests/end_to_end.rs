//! The six end-to-end compile-and-run scenarios (spec.md §8 "End-to-end
//! scenarios"), driven entirely through the public API: build [`Term`]
//! clauses and a query, compile and link them, run the query to exhaustion,
//! and check the reported bindings.

use wam_vm::compiler::{compile_clauses, compile_predicate_def, place_query_goal};
use wam_vm::{Clause, Goal, Linker, Machine, RawGoal, Term};

/// Functor ids used across these tests. Each test picks its own small,
/// disjoint range so none of them collide.
mod ids {
    pub const A: u32 = 1;
    pub const B: u32 = 2;
}

fn compile_and_run(
    define: impl FnOnce(&mut Linker),
    query: RawGoal,
) -> Vec<wam_vm::Solution> {
    let mut linker = Linker::new();
    define(&mut linker);
    let (entry, vars) = place_query_goal(&mut linker, Some(query)).unwrap().remove(0);
    let program = linker.link().unwrap();
    let mut machine = Machine::new(program);
    machine.run(entry, vars).map(Result::unwrap).collect()
}

/// 1. Atom unification: `a.` / `?- a.` succeeds with no bindings; `?- b.`
/// fails outright (no predicate named `b/0` was ever defined).
#[test]
fn atom_unification() {
    const P: u32 = 100;
    let solutions = compile_and_run(
        |linker| compile_predicate_def(linker, P, 0, Term::atom(P), None).unwrap(),
        RawGoal::Call(Term::atom(P)),
    );
    assert_eq!(solutions.len(), 1);
    assert!(solutions[0].bindings.is_empty());
}

#[test]
fn atom_unification_failure() {
    const P: u32 = 100;
    const OTHER: u32 = 101;
    let mut linker = Linker::new();
    compile_predicate_def(&mut linker, P, 0, Term::atom(P), None).unwrap();
    // `b/0` is never defined, so its call site can never be resolved; the
    // linker itself rejects the program rather than letting it run and fail
    // at the first instruction (spec.md §7 kind 3).
    let placed = place_query_goal(&mut linker, Some(RawGoal::Call(Term::atom(OTHER))));
    assert!(placed.is_ok());
    assert!(linker.link().is_err());
}

/// 2. Variable binding: `p(x).` / `?- p(X).` → one solution, `X = x`.
#[test]
fn variable_binding() {
    const P: u32 = 100;
    let x = 0;
    let solutions = compile_and_run(
        |linker| {
            compile_predicate_def(linker, P, 1, Term::compound(P, vec![Term::atom(ids::A)]), None).unwrap();
        },
        RawGoal::Call(Term::compound(P, vec![Term::Var(x)])),
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(x), Some(&Term::atom(ids::A)));
}

/// 3. Structure matching: `p(f(a,b)).` / `?- p(f(Y,Z)).` → `Y = a, Z = b`.
#[test]
fn structure_matching() {
    const P: u32 = 100;
    const F: u32 = 101;
    let (y, z) = (0, 1);
    let solutions = compile_and_run(
        |linker| {
            let head = Term::compound(P, vec![Term::compound(F, vec![Term::atom(ids::A), Term::atom(ids::B)])]);
            compile_predicate_def(linker, P, 1, head, None).unwrap();
        },
        RawGoal::Call(Term::compound(P, vec![Term::compound(F, vec![Term::Var(y), Term::Var(z)])])),
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(y), Some(&Term::atom(ids::A)));
    assert_eq!(solutions[0].get(z), Some(&Term::atom(ids::B)));
}

/// 4. Conjunction and backtracking: `p(1). p(2). p(3). q(X) :- p(X).` /
/// `?- q(X).` → three solutions in order `X = 1; X = 2; X = 3`.
#[test]
fn conjunction_and_backtracking() {
    const P: u32 = 100;
    const Q: u32 = 101;
    const ONE: u32 = 201;
    const TWO: u32 = 202;
    const THREE: u32 = 203;
    let x = 0;
    let solutions = compile_and_run(
        |linker| {
            let facts = vec![
                Clause::fact(Term::compound(P, vec![Term::atom(ONE)])),
                Clause::fact(Term::compound(P, vec![Term::atom(TWO)])),
                Clause::fact(Term::compound(P, vec![Term::atom(THREE)])),
            ];
            compile_clauses(linker, P, 1, facts).unwrap();
            compile_predicate_def(
                linker,
                Q,
                1,
                Term::compound(Q, vec![Term::Var(x)]),
                Some(RawGoal::Call(Term::compound(P, vec![Term::Var(x)]))),
            )
            .unwrap();
        },
        RawGoal::Call(Term::compound(Q, vec![Term::Var(x)])),
    );
    let values: Vec<_> = solutions.iter().map(|s| s.get(x).cloned().unwrap()).collect();
    assert_eq!(values, vec![Term::atom(ONE), Term::atom(TWO), Term::atom(THREE)]);
}

/// 5. Chained variable propagation:
/// `p(X,Y) :- q(X,Z), r(Z,Y). q(a,b). r(b,c).` / `?- p(A,B).` → `A = a, B = c`.
#[test]
fn chained_variable_propagation() {
    const P: u32 = 100;
    const Q: u32 = 101;
    const R: u32 = 102;
    const ATOM_A: u32 = 201;
    const ATOM_B: u32 = 202;
    const ATOM_C: u32 = 203;
    let (px, py, pz) = (0, 1, 2);
    let (qa, qb) = (10, 11);
    let solutions = compile_and_run(
        |linker| {
            compile_clauses(linker, Q, 2, vec![Clause::fact(Term::compound(Q, vec![Term::atom(ATOM_A), Term::atom(ATOM_B)]))]).unwrap();
            compile_clauses(linker, R, 2, vec![Clause::fact(Term::compound(R, vec![Term::atom(ATOM_B), Term::atom(ATOM_C)]))]).unwrap();
            let body = RawGoal::Conjunction(
                Box::new(RawGoal::Call(Term::compound(Q, vec![Term::Var(px), Term::Var(pz)]))),
                Box::new(RawGoal::Call(Term::compound(R, vec![Term::Var(pz), Term::Var(py)]))),
            );
            compile_predicate_def(linker, P, 2, Term::compound(P, vec![Term::Var(px), Term::Var(py)]), Some(body)).unwrap();
        },
        RawGoal::Call(Term::compound(P, vec![Term::Var(qa), Term::Var(qb)])),
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(qa), Some(&Term::atom(ATOM_A)));
    assert_eq!(solutions[0].get(qb), Some(&Term::atom(ATOM_C)));
}

/// 6. Cut prunes alternatives: `p(1). p(2) :- !. p(3).` / `?- p(X).` →
/// `X = 1; X = 2`, never `X = 3`.
#[test]
fn cut_prunes_alternatives() {
    const P: u32 = 100;
    const ONE: u32 = 201;
    const TWO: u32 = 202;
    const THREE: u32 = 203;
    let x = 0;
    let solutions = compile_and_run(
        |linker| {
            let clauses = vec![
                Clause::fact(Term::compound(P, vec![Term::atom(ONE)])),
                Clause { head: Term::compound(P, vec![Term::atom(TWO)]), body: vec![Goal::Cut] },
                Clause::fact(Term::compound(P, vec![Term::atom(THREE)])),
            ];
            compile_clauses(linker, P, 1, clauses).unwrap();
        },
        RawGoal::Call(Term::compound(P, vec![Term::Var(x)])),
    );
    let values: Vec<_> = solutions.iter().map(|s| s.get(x).cloned().unwrap()).collect();
    assert_eq!(values, vec![Term::atom(ONE), Term::atom(TWO)]);
}
