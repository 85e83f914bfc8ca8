//! Predicate compilation: stitches a `name/arity`'s clauses into a
//! try/retry/trust chain, with optional first-argument indexing (spec.md
//! §4.3 "Predicate compilation", SPEC_FULL.md §4 "first-argument indexing,
//! implemented").

use alloc::{collections::BTreeMap, vec, vec::Vec};

use itertools::Itertools;
use wam_asm::{FunctorRef, Instruction, SwitchOnConstTable, SwitchOnStrucTable, SwitchTableEntry};
use wam_types::{CodeAddr, FunctorId};

use crate::compiler::alloc::allocate;
use crate::compiler::clause::compile_clause;
use crate::compiler::peephole::optimize_clause;
use crate::error::CompileError;
use crate::linker::Linker;
use crate::term::{Clause, Term};

/// Compile and link every clause of one `name/arity`, registering its entry
/// point with the linker (spec.md §3 "Call table").
///
/// Clauses are compiled once, placed inline behind their own
/// `try_me_else`/`retry_me_else`/`trust_me` choice instruction (the
/// fallback chain, always correct regardless of `A1`'s binding). When the
/// clauses' first arguments admit it, a `switch_on_term` dispatcher is
/// additionally built in front of that chain, with indexed
/// `try`/`retry`/`trust` sub-chains jumping directly into the clause bodies
/// already placed by the fallback chain (spec.md §4.3 "Optional
/// first-argument indexing").
pub fn compile_predicate(
    linker: &mut Linker,
    name: FunctorId,
    arity: u8,
    clauses: &[Clause],
) -> Result<(), CompileError> {
    assert!(!clauses.is_empty(), "a predicate must have at least one clause");

    let mut compiled = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let allocation = allocate(clause);
        compiled.push(optimize_clause(compile_clause(clause, &allocation)?));
    }

    let buckets: Vec<Bucket> = clauses.iter().map(|c| classify(&c.head)).collect();
    let indexable = arity > 0 && clauses.len() > 1 && buckets.iter().any(|b| *b != Bucket::Var);

    let (fallback_start, body_addrs) = emit_fallback_chain(linker, &compiled);

    let entry = if indexable {
        emit_index(linker, fallback_start, &buckets, &body_addrs)
    } else {
        fallback_start
    };

    linker.define_predicate(name, arity, entry);
    Ok(())
}

/// Emit every clause's body, interleaved with the unconditional
/// `try_me_else`/`retry_me_else`/`trust_me` choice sequence a caller reaches
/// when `A1` gives no help narrowing the candidates (or when there is no
/// indexing at all). Returns the chain's own start address and, for each
/// clause, the address of its body's first instruction (the jump target
/// indexed sub-chains use to skip straight past the unconditional choice
/// instruction that physically precedes it here).
fn emit_fallback_chain(
    linker: &mut Linker,
    compiled: &[super::clause::CompiledClause],
) -> (CodeAddr, Vec<CodeAddr>) {
    let n = compiled.len();
    let chain_start = linker.here();
    let mut choice_addrs = Vec::with_capacity(n);
    let mut body_addrs = Vec::with_capacity(n);

    for (i, clause) in compiled.iter().enumerate() {
        if n > 1 {
            let placeholder = if i == 0 {
                Instruction::TryMeElse { target: wam_types::UNRESOLVED }
            } else if i == n - 1 {
                Instruction::TrustMe
            } else {
                Instruction::RetryMeElse { target: wam_types::UNRESOLVED }
            };
            choice_addrs.push(linker.emit(&placeholder));
        }
        body_addrs.push(place_clause_body(linker, clause));
    }

    if n > 1 {
        for i in 0..n - 1 {
            linker.patch(choice_addrs[i], choice_addrs[i + 1]);
        }
    }

    (chain_start, body_addrs)
}

fn place_clause_body(linker: &mut Linker, clause: &super::clause::CompiledClause) -> CodeAddr {
    let start = linker.here();
    for (i, instr) in clause.instructions.iter().enumerate() {
        let at = linker.emit(instr);
        if let Some(site) = clause.call_sites.iter().find(|s| s.instr_index == i) {
            linker.record_call_site(at, site.name, site.arity);
        }
    }
    start
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Var,
    Const(u32),
    Struct(FunctorId, u8),
    List,
}

fn classify(head: &Term) -> Bucket {
    let arg0 = match head {
        Term::Functor { args, .. } => args.first(),
        _ => None,
    };
    match arg0 {
        None | Some(Term::Var(_)) => Bucket::Var,
        Some(Term::Nil) => Bucket::Const(crate::compiler::emit::NIL),
        Some(Term::Functor { name, args }) if args.is_empty() => Bucket::Const(*name),
        Some(Term::Functor { name, args }) => Bucket::Struct(*name, args.len() as u8),
        Some(Term::Cons(..)) => Bucket::List,
    }
}

/// Build the `switch_on_term` dispatcher and its indexed sub-chains in front
/// of the already-placed fallback chain, returning the dispatcher's address
/// (the predicate's real entry point).
fn emit_index(linker: &mut Linker, fallback_start: CodeAddr, buckets: &[Bucket], body_addrs: &[CodeAddr]) -> CodeAddr {
    let var_targets: Vec<CodeAddr> =
        buckets.iter().zip(body_addrs).filter(|(b, _)| **b == Bucket::Var).map(|(_, a)| *a).collect();

    // Every bucket keyed by a concrete first-argument shape is the
    // subsequence of *all* clauses, in original order, whose own bucket is
    // either `Var` (matches any `A1`) or this exact key — never the
    // var-clauses-then-matches concatenation a naive two-pass grouping would
    // produce, since clause order still matters once several candidates tie.
    let const_keys: Vec<u32> = buckets
        .iter()
        .filter_map(|b| if let Bucket::Const(k) = b { Some(*k) } else { None })
        .unique()
        .collect();
    let struct_keys: Vec<(FunctorId, u8)> = buckets
        .iter()
        .filter_map(|b| if let Bucket::Struct(n, a) = b { Some((*n, *a)) } else { None })
        .unique()
        .collect();
    let has_list = buckets.iter().any(|b| *b == Bucket::List);

    let subsequence = |matches: &dyn Fn(&Bucket) -> bool| -> Vec<CodeAddr> {
        buckets
            .iter()
            .zip(body_addrs)
            .filter(|(b, _)| **b == Bucket::Var || matches(b))
            .map(|(_, a)| *a)
            .collect()
    };

    let mut const_groups: BTreeMap<u32, Vec<CodeAddr>> = BTreeMap::new();
    for k in const_keys {
        const_groups.insert(k, subsequence(&|b| *b == Bucket::Const(k)));
    }
    let mut struct_groups: BTreeMap<(FunctorId, u8), Vec<CodeAddr>> = BTreeMap::new();
    for key in struct_keys {
        struct_groups.insert(key, subsequence(&|b| *b == Bucket::Struct(key.0, key.1)));
    }
    let list_targets: Vec<CodeAddr> = if has_list { subsequence(&|b| *b == Bucket::List) } else { Vec::new() };

    let on_var = if var_targets.is_empty() { fallback_start } else { emit_indexed_chain(linker, &var_targets) };
    let on_list = if list_targets.is_empty() { on_var } else { emit_indexed_chain(linker, &list_targets) };

    let const_table = if const_groups.is_empty() {
        None
    } else {
        let entries = const_groups
            .iter()
            .map(|(key, group)| SwitchTableEntry { key: *key, target: emit_indexed_chain(linker, group) })
            .collect();
        Some(SwitchOnConstTable { default: on_var, entries })
    };
    let struct_table = if struct_groups.is_empty() {
        None
    } else {
        let entries = struct_groups
            .iter()
            .map(|((name, ar), group)| SwitchTableEntry {
                key: FunctorRef::new(*name, *ar),
                target: emit_indexed_chain(linker, group),
            })
            .collect();
        Some(SwitchOnStrucTable { default: on_var, entries })
    };

    let on_const = match &const_table {
        Some(_) => linker.here(),
        None => on_var,
    };
    if let Some(t) = const_table {
        linker.emit(&Instruction::SwitchOnConst(t));
    }
    let on_struc = match &struct_table {
        Some(_) => linker.here(),
        None => on_var,
    };
    if let Some(t) = struct_table {
        linker.emit(&Instruction::SwitchOnStruc(t));
    }

    linker.emit(&Instruction::SwitchOnTerm { on_var, on_const, on_list, on_struc })
}

/// Emit an indexed `try`/`retry`/`trust` chain jumping to each of `targets`
/// in order (spec.md §4.3: the `switch_on_*` counterpart to
/// `try_me_else`/`retry_me_else`/`trust_me`, used because these clause
/// bodies already live elsewhere in the fallback chain and must be reached
/// by jump rather than fallthrough).
fn emit_indexed_chain(linker: &mut Linker, targets: &[CodeAddr]) -> CodeAddr {
    if targets.len() == 1 {
        return targets[0];
    }
    let start = linker.here();
    let n = targets.len();
    for (i, target) in targets.iter().enumerate() {
        let instr = if i == 0 {
            Instruction::Try { target: *target }
        } else if i == n - 1 {
            Instruction::Trust { target: *target }
        } else {
            Instruction::Retry { target: *target }
        };
        linker.emit(&instr);
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Goal;

    #[test]
    fn single_clause_predicate_has_no_choice_instruction() {
        let mut linker = Linker::new();
        let clause = Clause::fact(Term::atom(10));
        compile_predicate(&mut linker, 10, 0, &[clause]).unwrap();
        let program = linker.link().unwrap();
        let entry = program.call_table[&(10, 0)];
        let (decoded, _) = wam_asm::disassemble(&program.code[entry as usize..]).unwrap();
        assert_eq!(decoded, Instruction::Proceed);
    }

    #[test]
    fn two_clause_predicate_chains_try_and_trust() {
        let mut linker = Linker::new();
        let a = Clause::fact(Term::compound(1, vec![Term::atom(10)]));
        let b = Clause::fact(Term::compound(1, vec![Term::atom(11)]));
        compile_predicate(&mut linker, 1, 1, &[a, b]).unwrap();
        let program = linker.link().unwrap();
        let entry = program.call_table[&(1, 1)];
        let (decoded, _) = wam_asm::disassemble(&program.code[entry as usize..]).unwrap();
        assert!(matches!(decoded, Instruction::TryMeElse { .. }) || matches!(decoded, Instruction::SwitchOnTerm { .. }));
    }

    #[test]
    fn indexing_is_skipped_when_every_clause_has_a_variable_first_argument() {
        let mut linker = Linker::new();
        let a = Clause { head: Term::compound(1, vec![Term::Var(0)]), body: vec![Goal::Call(Term::atom(20))] };
        let b = Clause { head: Term::compound(1, vec![Term::Var(1)]), body: vec![Goal::Call(Term::atom(21))] };
        compile_predicate(&mut linker, 1, 1, &[a, b]).unwrap();
        let program = linker.link().unwrap();
        let entry = program.call_table[&(1, 1)];
        let (decoded, _) = wam_asm::disassemble(&program.code[entry as usize..]).unwrap();
        assert!(matches!(decoded, Instruction::TryMeElse { .. }));
    }
}
