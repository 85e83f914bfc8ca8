//! Instruction compiler (spec.md §4.3): turns one clause head or one body
//! goal into its `get_*`/`unify_*` or `put_*`/`set_*` instruction sequence.

use alloc::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    vec::Vec,
};

use wam_asm::{AddrMode, FunctorRef, Instruction};
use wam_types::{FunctorId, RegIndex, VarId};

use crate::compiler::alloc::Allocation;
use crate::term::Term;

/// Reserved functor id for `[]`, the empty list constant (SPEC_FULL.md §4:
/// lists are a supplemented feature, not named by `spec.md`'s instruction
/// set beyond `put_list`/`get_list`, so this crate picks a dedicated
/// constant rather than routing `[]` through the general interner, the way
/// `fuel_asm` reserves register/opcode ranges rather than overloading one).
pub const NIL: FunctorId = FunctorId::MAX;

/// Per-goal temporary-register allocator (see `compiler::alloc` module docs
/// for why this resets per goal instead of threading one clause-wide
/// counter).
pub(crate) struct GoalRegs<'a> {
    alloc: &'a Allocation,
    next_temp: RegIndex,
    local_reg: BTreeMap<VarId, RegIndex>,
    /// First-occurrence tracking for *permanent* variables only, shared by
    /// reference across every goal of the clause (head included): a
    /// permanent variable's first occurrence can be in any goal, and every
    /// later goal must treat it as already-bound (`put_val`, never
    /// `put_var`) regardless of whether this is the first time *this* goal
    /// happens to mention it. Non-permanent variables don't need this: by
    /// definition they occur in exactly one goal, so `local_reg`'s presence
    /// check already is the clause-wide first-occurrence check for them.
    perm_seen: &'a mut BTreeSet<VarId>,
    /// Registers assigned to nested compound subterms built while compiling
    /// a body goal's arguments, keyed by the subterm's address (stable for
    /// the lifetime of this goal's single compile pass). Looked up by
    /// [`GoalRegs::struct_reg`] when the parent structure references it via
    /// `set_val`.
    struct_regs: BTreeMap<usize, RegIndex>,
}

impl<'a> GoalRegs<'a> {
    pub fn new(alloc: &'a Allocation, arity: u8, perm_seen: &'a mut BTreeSet<VarId>) -> Self {
        Self {
            alloc,
            next_temp: arity.saturating_add(1),
            local_reg: BTreeMap::new(),
            perm_seen,
            struct_regs: BTreeMap::new(),
        }
    }

    fn fresh_temp(&mut self) -> RegIndex {
        let r = self.next_temp;
        self.next_temp = self.next_temp.saturating_add(1);
        r
    }

    pub fn fresh_temp_pub(&mut self) -> RegIndex {
        self.fresh_temp()
    }

    pub fn remember_struct(&mut self, term: &Term, reg: RegIndex) {
        self.struct_regs.insert(term as *const Term as usize, reg);
    }

    pub fn struct_reg(&self, term: &Term) -> RegIndex {
        *self
            .struct_regs
            .get(&(term as *const Term as usize))
            .expect("struct_reg: nested term was not pre-assigned a register")
    }

    /// Resolve a variable occurrence. `positional`, if given, is the
    /// register this variable should take if this is its first, non-
    /// permanent occurrence at a top-level argument position (rule 2/3:
    /// shares the index with `Ai`).
    ///
    /// Returns `(mode, reg, is_first_occurrence)`.
    fn resolve_var(&mut self, v: VarId, positional: Option<RegIndex>) -> (AddrMode, RegIndex, bool) {
        if let Some(&slot) = self.alloc.perm_slot.get(&v) {
            let first = self.perm_seen.insert(v);
            (AddrMode::Stack, slot, first)
        } else {
            let first = !self.local_reg.contains_key(&v);
            let reg = *self.local_reg.entry(v).or_insert_with(|| positional.unwrap_or(0));
            let reg = if reg == 0 {
                let r = self.fresh_temp();
                self.local_reg.insert(v, r);
                r
            } else {
                reg
            };
            (AddrMode::Reg, reg, first)
        }
    }
}

/// Compile a clause head's `get_*`/`unify_*` sequence (spec.md §4.3 "Program
/// emission", steps 2).
pub(crate) fn compile_head(head: &Term, alloc: &Allocation, regs: &mut GoalRegs, out: &mut Vec<Instruction>) {
    let args = match head {
        Term::Functor { args, .. } => args,
        _ => return,
    };
    let mut queue: VecDeque<(AddrMode, RegIndex, &Term)> = VecDeque::new();
    for (i, a) in args.iter().enumerate() {
        let ai = (i + 1) as RegIndex;
        compile_head_top(a, ai, alloc, regs, out, &mut queue);
    }
    while let Some((mode, reg, term)) = queue.pop_front() {
        compile_unify_struct(mode, reg, term, alloc, regs, out, &mut queue);
    }
}

fn compile_head_top<'t>(
    term: &'t Term,
    ai: RegIndex,
    alloc: &Allocation,
    regs: &mut GoalRegs,
    out: &mut Vec<Instruction>,
    queue: &mut VecDeque<(AddrMode, RegIndex, &'t Term)>,
) {
    match term {
        Term::Var(v) => {
            let (mode, reg, first) = regs.resolve_var(*v, Some(ai));
            if first {
                if !(mode == AddrMode::Reg && reg == ai) {
                    out.push(Instruction::GetVar { mode, var: reg, arg: ai });
                }
            } else {
                out.push(Instruction::GetVal { mode, var: reg, arg: ai });
            }
        }
        Term::Nil => out.push(Instruction::GetConst { mode: AddrMode::Reg, reg: ai, constant: NIL }),
        Term::Functor { name, args } if args.is_empty() => {
            out.push(Instruction::GetConst { mode: AddrMode::Reg, reg: ai, constant: *name });
        }
        Term::Functor { name, args } => {
            out.push(Instruction::GetStruc {
                mode: AddrMode::Reg,
                reg: ai,
                functor: FunctorRef::new(*name, args.len() as u8),
            });
            queue.push_back((AddrMode::Reg, ai, term));
        }
        Term::Cons(..) => {
            out.push(Instruction::GetList { mode: AddrMode::Reg, reg: ai });
            queue.push_back((AddrMode::Reg, ai, term));
        }
    }
    let _ = alloc;
}

fn compile_unify_struct<'t>(
    _mode: AddrMode,
    _reg: RegIndex,
    term: &'t Term,
    alloc: &Allocation,
    regs: &mut GoalRegs,
    out: &mut Vec<Instruction>,
    queue: &mut VecDeque<(AddrMode, RegIndex, &'t Term)>,
) {
    let children: [Option<&Term>; 2] = match term {
        Term::Functor { args, .. } => {
            for a in args {
                compile_unify_member(a, alloc, regs, out, queue);
            }
            return;
        }
        Term::Cons(h, t) => [Some(h.as_ref()), Some(t.as_ref())],
        _ => return,
    };
    for child in children.into_iter().flatten() {
        compile_unify_member(child, alloc, regs, out, queue);
    }
}

fn compile_unify_member<'t>(
    term: &'t Term,
    alloc: &Allocation,
    regs: &mut GoalRegs,
    out: &mut Vec<Instruction>,
    queue: &mut VecDeque<(AddrMode, RegIndex, &'t Term)>,
) {
    match term {
        Term::Var(v) if alloc.is_singleton(*v) => out.push(Instruction::UnifyVoid { count: 1 }),
        Term::Var(v) => {
            let (mode, reg, first) = regs.resolve_var(*v, None);
            if first {
                out.push(Instruction::UnifyVar { mode, reg });
            } else if mode == AddrMode::Stack {
                out.push(Instruction::UnifyLocalVal { mode, reg });
            } else {
                out.push(Instruction::UnifyVal { mode, reg });
            }
        }
        Term::Nil => out.push(Instruction::UnifyConst { constant: NIL }),
        Term::Functor { name, args } if args.is_empty() => out.push(Instruction::UnifyConst { constant: *name }),
        Term::Functor { .. } | Term::Cons(..) => {
            let reg = regs_fresh_for_nested(regs);
            out.push(Instruction::UnifyVar { mode: AddrMode::Reg, reg });
            queue.push_back((AddrMode::Reg, reg, term));
        }
    }
}

fn regs_fresh_for_nested(regs: &mut GoalRegs) -> RegIndex {
    regs.fresh_temp()
}

/// Compile one body goal's argument-building sequence (spec.md §4.3 "Query
/// emission"), in post-order so inner structures reach the heap before
/// their enclosing structure is built (spec.md §4.6 "Query-flattening").
pub(crate) fn compile_goal_args(goal: &Term, alloc: &Allocation, regs: &mut GoalRegs, out: &mut Vec<Instruction>) {
    let args = match goal {
        Term::Functor { args, .. } => args,
        _ => return,
    };
    for (i, a) in args.iter().enumerate() {
        let ai = (i + 1) as RegIndex;
        compile_goal_top(a, ai, alloc, regs, out);
    }
}

fn compile_goal_top(term: &Term, ai: RegIndex, alloc: &Allocation, regs: &mut GoalRegs, out: &mut Vec<Instruction>) {
    match term {
        Term::Var(v) => {
            let (mode, reg, first) = regs.resolve_var(*v, Some(ai));
            if first {
                out.push(Instruction::PutVar { mode, var: reg, arg: ai });
            } else if mode == AddrMode::Stack && is_last_occurrence_here(alloc, *v) {
                out.push(Instruction::PutUnsafeVal { mode, var: reg, arg: ai });
            } else if mode == AddrMode::Reg && reg == ai {
                // already in place from an earlier identical-position put; no-op.
            } else {
                out.push(Instruction::PutVal { mode, var: reg, arg: ai });
            }
        }
        Term::Nil => out.push(Instruction::PutConst { mode: AddrMode::Reg, reg: ai, constant: NIL }),
        Term::Functor { name, args } if args.is_empty() => {
            out.push(Instruction::PutConst { mode: AddrMode::Reg, reg: ai, constant: *name });
        }
        Term::Functor { name, args } => {
            for a in args {
                compile_build_member(a, alloc, regs, out);
            }
            out.push(Instruction::PutStruc {
                mode: AddrMode::Reg,
                reg: ai,
                functor: FunctorRef::new(*name, args.len() as u8),
            });
            for a in args {
                compile_set_member(a, alloc, regs, out);
            }
        }
        Term::Cons(h, t) => {
            compile_build_member(h, alloc, regs, out);
            compile_build_member(t, alloc, regs, out);
            out.push(Instruction::PutList { mode: AddrMode::Reg, reg: ai });
            compile_set_member(h, alloc, regs, out);
            compile_set_member(t, alloc, regs, out);
        }
    }
}

/// Post-order pre-pass: recursively build any nested compound *before* the
/// structure that contains it (spec.md §4.6 "inner structures are on the
/// heap before their enclosing structure is built").
fn compile_build_member(term: &Term, alloc: &Allocation, regs: &mut GoalRegs, out: &mut Vec<Instruction>) {
    if let Term::Functor { name, args } = term {
        if !args.is_empty() {
            for a in args {
                compile_build_member(a, alloc, regs, out);
            }
            let reg = regs.fresh_temp_pub();
            out.push(Instruction::PutStruc { mode: AddrMode::Reg, reg, functor: FunctorRef::new(*name, args.len() as u8) });
            for a in args {
                compile_set_member(a, alloc, regs, out);
            }
            regs.remember_struct(term, reg);
        }
    } else if let Term::Cons(h, t) = term {
        compile_build_member(h, alloc, regs, out);
        compile_build_member(t, alloc, regs, out);
        let reg = regs.fresh_temp_pub();
        out.push(Instruction::PutList { mode: AddrMode::Reg, reg });
        compile_set_member(h, alloc, regs, out);
        compile_set_member(t, alloc, regs, out);
        regs.remember_struct(term, reg);
    }
}

/// Emit the `set_*` cell for one member of a structure/list being built.
fn compile_set_member(term: &Term, alloc: &Allocation, regs: &mut GoalRegs, out: &mut Vec<Instruction>) {
    match term {
        Term::Var(v) if alloc.is_singleton(*v) => out.push(Instruction::SetVoid { count: 1 }),
        Term::Var(v) => {
            let (mode, reg, first) = regs.resolve_var(*v, None);
            if first {
                out.push(Instruction::SetVar { mode, reg });
            } else if mode == AddrMode::Stack {
                out.push(Instruction::SetLocalVal { mode, reg });
            } else {
                out.push(Instruction::SetVal { mode, reg });
            }
        }
        Term::Nil => out.push(Instruction::SetConst { constant: NIL }),
        Term::Functor { name, args } if args.is_empty() => out.push(Instruction::SetConst { constant: *name }),
        Term::Functor { .. } | Term::Cons(..) => {
            let reg = regs.struct_reg(term);
            out.push(Instruction::SetVal { mode: AddrMode::Reg, reg });
        }
    }
}

fn is_last_occurrence_here(_alloc: &Allocation, _v: VarId) -> bool {
    // Whether this is the last occurrence of a permanent variable, restricted
    // to it appearing only in argument position of this goal, decides
    // `put_unsafe_val` (spec.md §4.2 rule 5). The conservative, always-safe
    // choice is to never take the unsafe path and instead rely on ordinary
    // `put_val`/`get_val`, which is correct but forgoes the optimization;
    // this implementation always globalizes eagerly via `*_local_val` at the
    // point of first heap-write instead (see `compile_unify_member`/
    // `compile_set_member`), which already satisfies invariant 6 without
    // needing occurrence-counting here. `put_unsafe_val` is therefore never
    // emitted by this compiler; it remains a fully supported, round-tripping
    // opcode for hand-assembled code (see `wam-asm`'s tests).
    false
}
