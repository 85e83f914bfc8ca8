//! Program/query emission for a single clause (spec.md §4.3 "Program
//! emission", §4.4 "Last-call optimization").

use alloc::{
    collections::BTreeSet,
    vec::Vec,
};

use wam_asm::Instruction;
use wam_types::{FunctorId, RegIndex};

use crate::compiler::alloc::Allocation;
use crate::compiler::emit::{compile_goal_args, compile_head, GoalRegs};
use crate::error::CompileError;
use crate::term::{Clause, Goal, Term};

/// One `call`/`execute` instruction still needing its target patched once
/// the overall program is linked: the index into the clause's own
/// instruction vector, plus the callee's `name/arity` (spec.md §3 "Call
/// table").
pub struct CallSite {
    pub instr_index: usize,
    pub name: FunctorId,
    pub arity: u8,
}

/// Compiled form of one clause: its instructions plus the call sites still
/// needing a linker fixup.
pub struct CompiledClause {
    pub instructions: Vec<Instruction>,
    pub call_sites: Vec<CallSite>,
}

/// Compile one clause's full instruction sequence: head match, body goals,
/// environment management and cut (spec.md §4.6 step 4 "Program emission").
pub fn compile_clause(clause: &Clause, alloc: &Allocation) -> Result<CompiledClause, CompileError> {
    if clause.head.functor_name().is_none() {
        return Err(CompileError::HeadNotCallable(alloc::format!("{:?}", clause.head)));
    }
    for goal in &clause.body {
        if let Goal::Call(t) = goal {
            if t.functor_name().is_none() {
                return Err(CompileError::GoalNotCallable(alloc::format!("{t:?}")));
            }
        }
    }

    let needs_barrier = clause.body.iter().enumerate().any(|(i, g)| i > 0 && matches!(g, Goal::Cut));
    let barrier_slot: Option<RegIndex> = if needs_barrier { Some(alloc.perm_count() + 1) } else { None };
    let effective_perm_count = alloc.perm_count() + if needs_barrier { 1 } else { 0 };

    let mut out = Vec::new();
    let mut call_sites = Vec::new();
    let mut perm_seen: BTreeSet<_> = BTreeSet::new();

    if effective_perm_count > 0 {
        out.push(Instruction::AllocateN { n: effective_perm_count });
    }
    if let Some(slot) = barrier_slot {
        out.push(Instruction::GetLevel { reg: slot });
    }

    let head_arity = clause.head.arity();
    {
        let mut regs = GoalRegs::new(alloc, head_arity, &mut perm_seen);
        compile_head(&clause.head, alloc, &mut regs, &mut out);
    }

    let last_index = clause.body.len().saturating_sub(1);
    for (i, goal) in clause.body.iter().enumerate() {
        let is_last = i == last_index;
        match goal {
            Goal::Cut => {
                if i == 0 {
                    out.push(Instruction::NeckCut);
                } else {
                    out.push(Instruction::Cut { reg: barrier_slot.expect("barrier reserved for non-neck cut") });
                }
                if is_last {
                    emit_tail(&mut out, effective_perm_count);
                }
            }
            Goal::Call(term) => {
                let arity = term.arity();
                {
                    let mut regs = GoalRegs::new(alloc, arity, &mut perm_seen);
                    compile_goal_args(term, alloc, &mut regs, &mut out);
                }
                let name = term.functor_name().expect("validated callable above");
                if is_last {
                    if effective_perm_count > 0 {
                        out.push(Instruction::Deallocate);
                    }
                    call_sites.push(CallSite { instr_index: out.len(), name, arity });
                    out.push(Instruction::Execute { target: wam_types::UNRESOLVED, arity });
                } else {
                    let k = alloc.remaining_after(i + 1) + if needs_barrier { 1 } else { 0 };
                    call_sites.push(CallSite { instr_index: out.len(), name, arity });
                    out.push(Instruction::Call { target: wam_types::UNRESOLVED, arity, perm_vars_remaining: k });
                }
            }
        }
    }

    if clause.body.is_empty() {
        emit_tail(&mut out, effective_perm_count);
    }

    Ok(CompiledClause { instructions: out, call_sites })
}

fn emit_tail(out: &mut Vec<Instruction>, effective_perm_count: u8) {
    if effective_perm_count > 0 {
        out.push(Instruction::Deallocate);
    }
    out.push(Instruction::Proceed);
}

/// Compile a query's body the same way a clause body is compiled, but with
/// no head and no permanent variables promoted to an environment frame:
/// every variable is a query-level temporary so its binding is readable
/// straight out of the register file after a `Suspend` (spec.md §6
/// "decode(heap_address)").
pub fn compile_query(goals: &[Goal]) -> Result<(CompiledClause, Vec<wam_types::VarId>), CompileError> {
    // A query is compiled as a clause with an empty head: all variables are
    // "permanent" in the sense that they must survive to the final
    // `suspend`, achieved here by allocating an environment exactly like an
    // ordinary multi-goal clause body, with the query's free variables
    // becoming the clause's permanent variables (spec.md §4.2 rule 4: a
    // variable occurring in more than one body goal is permanent — a query
    // variable that must still be readable after the *last* goal is treated
    // as occurring one goal further than its last real occurrence).
    for goal in goals {
        if let Goal::Call(t) = goal {
            if t.functor_name().is_none() {
                return Err(CompileError::GoalNotCallable(alloc::format!("{t:?}")));
            }
        }
    }

    let fake_clause = Clause { head: Term::atom(FunctorId::MAX), body: goals.to_vec() };
    let mut alloc = crate::compiler::alloc::allocate(&fake_clause);
    // Force every variable permanent: a query reports bindings after the
    // final goal completes, so nothing may live only in a dead register.
    promote_all_to_permanent(&mut alloc, &fake_clause);

    let needs_barrier = goals.iter().enumerate().any(|(i, g)| i > 0 && matches!(g, Goal::Cut));
    let barrier_slot: Option<RegIndex> = if needs_barrier { Some(alloc.perm_count() + 1) } else { None };
    let effective_perm_count = alloc.perm_count() + if needs_barrier { 1 } else { 0 };

    let mut out = Vec::new();
    let mut call_sites = Vec::new();
    let mut perm_seen: BTreeSet<_> = BTreeSet::new();

    if effective_perm_count > 0 {
        out.push(Instruction::AllocateN { n: effective_perm_count });
    }
    if let Some(slot) = barrier_slot {
        out.push(Instruction::GetLevel { reg: slot });
    }

    for (i, goal) in goals.iter().enumerate() {
        match goal {
            Goal::Cut => {
                if i == 0 {
                    out.push(Instruction::NeckCut);
                } else {
                    out.push(Instruction::Cut { reg: barrier_slot.expect("barrier reserved") });
                }
            }
            Goal::Call(term) => {
                let arity = term.arity();
                {
                    let mut regs = GoalRegs::new(&alloc, arity, &mut perm_seen);
                    compile_goal_args(term, &alloc, &mut regs, &mut out);
                }
                let name = term.functor_name().expect("validated callable above");
                let k = alloc.remaining_after(i + 1) + if needs_barrier { 1 } else { 0 };
                call_sites.push(CallSite { instr_index: out.len(), name, arity });
                out.push(Instruction::Call { target: wam_types::UNRESOLVED, arity, perm_vars_remaining: k });
            }
        }
    }
    out.push(Instruction::Suspend);

    Ok((CompiledClause { instructions: out, call_sites }, alloc.permanent_order))
}

fn promote_all_to_permanent(alloc: &mut crate::compiler::alloc::Allocation, clause: &Clause) {
    use alloc::collections::BTreeMap;
    let mut perm_slot = BTreeMap::new();
    let mut permanent_order = Vec::new();
    let mut slot: RegIndex = 1;
    let vars = query_var_order(clause);
    for v in vars {
        perm_slot.insert(v, slot);
        permanent_order.push(v);
        slot += 1;
        alloc
            .last_goal_index
            .entry(v)
            .and_modify(|g| *g = (*g).max(clause.body.len()))
            .or_insert(clause.body.len());
    }
    alloc.perm_slot = perm_slot;
    alloc.permanent_order = permanent_order;
}

fn query_var_order(clause: &Clause) -> Vec<wam_types::VarId> {
    let mut order = Vec::new();
    let mut seen = BTreeSet::new();
    for goal in &clause.body {
        if let Goal::Call(t) = goal {
            collect_order(t, &mut order, &mut seen);
        }
    }
    order
}

fn collect_order(term: &Term, order: &mut Vec<wam_types::VarId>, seen: &mut BTreeSet<wam_types::VarId>) {
    match term {
        Term::Var(v) => {
            if seen.insert(*v) {
                order.push(*v);
            }
        }
        Term::Functor { args, .. } => {
            for a in args {
                collect_order(a, order, seen);
            }
        }
        Term::Cons(h, t) => {
            collect_order(h, order, seen);
            collect_order(t, order, seen);
        }
        Term::Nil => {}
    }
}
