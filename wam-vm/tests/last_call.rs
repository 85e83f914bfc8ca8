//! Last-call neutrality (spec.md §8 "Last-call neutrality"): a predicate
//! recursive to depth >= 10^4, compiled with `execute` at its last goal,
//! must not exhaust the environment/choice-point stack — because each
//! recursive call deallocates its own frame before jumping to the next, the
//! stack never accumulates with depth.
//!
//! `count(zero). count(succ(N)) :- count(N).` is indexable on its first
//! argument's shape (a constant vs. a `succ/1` structure), so no choice
//! point is ever pushed either: the whole recursion runs at a combined
//! environment/choice-point depth of at most one.

use wam_vm::compiler::{compile_clauses, place_query_goal};
use wam_vm::{Clause, Goal, Linker, Machine, MachineConfig, RawGoal, Term};

const COUNT: u32 = 100;
const ZERO: u32 = 200;
const SUCC: u32 = 201;

fn nested_succ(depth: usize) -> Term {
    let mut t = Term::atom(ZERO);
    for _ in 0..depth {
        t = Term::compound(SUCC, vec![t]);
    }
    t
}

#[test]
fn deep_tail_recursion_runs_in_bounded_stack() {
    const DEPTH: usize = 10_000;

    let mut linker = Linker::new();
    let n = 0;
    let clauses = vec![
        Clause::fact(Term::compound(COUNT, vec![Term::atom(ZERO)])),
        Clause {
            head: Term::compound(COUNT, vec![Term::compound(SUCC, vec![Term::Var(n)])]),
            body: vec![Goal::Call(Term::compound(COUNT, vec![Term::Var(n)]))],
        },
    ];
    compile_clauses(&mut linker, COUNT, 1, clauses).unwrap();

    let (entry, vars) =
        place_query_goal(&mut linker, Some(RawGoal::Call(Term::compound(COUNT, vec![nested_succ(DEPTH)])))).unwrap().remove(0);
    let program = linker.link().unwrap();

    // A combined environment/choice-point stack capacity far smaller than
    // the recursion depth: if last-call optimization did not deallocate
    // each frame before its tail call, this would exhaust `Stack` well
    // before `DEPTH` recursive calls complete.
    let config = MachineConfig { stack_size: 8, ..MachineConfig::default() };
    let mut machine = Machine::with_config(program, config);

    let mut solutions = machine.run(entry, vars);
    let solution = solutions.next().expect("one solution").expect("no resource exhaustion");
    assert!(solution.bindings.is_empty());
    assert!(solutions.next().is_none());
}
