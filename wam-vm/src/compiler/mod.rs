//! Compiler pipeline (spec.md §4, §4.6 "End-to-end compilation algorithm").
//!
//! `precompile` expands disjunction into alternative clauses, `alloc`
//! assigns permanent variables and `Y` slots, `emit` turns one clause head
//! or body goal into its instruction sequence, `clause` assembles a whole
//! clause's instructions, `peephole` collapses void runs, and `predicate`
//! stitches a `name/arity`'s clauses into a linked, optionally indexed,
//! callable unit. Queries go through the same clause/peephole machinery
//! with an empty head (`clause::compile_query`), placed directly in the
//! code buffer by [`place_query`] rather than registered in the call table.

pub mod alloc;
pub mod clause;
pub(crate) mod emit;
pub mod peephole;
pub mod precompile;
pub mod predicate;

use alloc::vec::Vec;

use wam_types::{CodeAddr, FunctorId};

use crate::error::CompileError;
use crate::linker::Linker;
use crate::term::{Query, RawGoal, Term};

/// Compile one source predicate definition — a head and an optional raw
/// goal tree, possibly containing disjunction — into its clauses, register-
/// allocate, peephole-optimize and link each one (spec.md §6 top-level API
/// `compile(clause_or_query)`, clause case).
pub fn compile_predicate_def(
    linker: &mut Linker,
    name: FunctorId,
    arity: u8,
    head: Term,
    body: Option<RawGoal>,
) -> Result<(), CompileError> {
    let clauses = precompile::precompile(head, body);
    tracing::debug!(name, arity, clauses = clauses.len(), "compiler: compiling predicate definition");
    predicate::compile_predicate(linker, name, arity, &clauses)
}

/// Compile a whole predicate from its already-expanded clause list (used
/// when a caller has already run [`precompile::precompile`] once per source
/// clause and wants to merge several clauses defining the same
/// `name/arity`, e.g. `fact(1). fact(2). fact(N) :- ...`).
pub fn compile_clauses(
    linker: &mut Linker,
    name: FunctorId,
    arity: u8,
    clauses: Vec<crate::term::Clause>,
) -> Result<(), CompileError> {
    predicate::compile_predicate(linker, name, arity, &clauses)
}

/// Compile a top-level query and place it in the code buffer, registering
/// its internal call sites with the linker the same way a clause body's
/// are (spec.md §6 `compile(clause_or_query)`, query case). Returns the
/// address of the query's first instruction — where a caller starts
/// execution (`P := this address`) to run it — paired with the query's
/// free variables in `Y`-slot order, so a caller can label each slot's final
/// binding with the source variable it came from (spec.md §6 "a map from
/// named query variables to decoded terms").
pub fn place_query(linker: &mut Linker, query: Query) -> Result<(CodeAddr, Vec<wam_types::VarId>), CompileError> {
    let (compiled, var_slots) = clause::compile_query(&query.goals)?;
    let compiled = peephole::optimize_clause(compiled);
    let start = linker.here();
    for (i, instr) in compiled.instructions.iter().enumerate() {
        let at = linker.emit(instr);
        if let Some(site) = compiled.call_sites.iter().find(|s| s.instr_index == i) {
            linker.record_call_site(at, site.name, site.arity);
        }
    }
    Ok((start, var_slots))
}

/// Compile a raw query goal tree, expanding any top-level disjunction into
/// independent alternatives, and place each one (spec.md §6, §4.6 step 2
/// applied to queries). A disjunctive query yields several independent
/// entry points; a caller wanting "any alternative" tries each start
/// address in turn.
pub fn place_query_goal(
    linker: &mut Linker,
    goal: Option<RawGoal>,
) -> Result<Vec<(CodeAddr, Vec<wam_types::VarId>)>, CompileError> {
    precompile::precompile_query(goal)
        .into_iter()
        .map(|goals| place_query(linker, Query { goals }))
        .collect()
}
