use core::fmt;

use wam_types::{CodeAddr, RegIndex};

use crate::{AddrMode, FunctorRef, Opcode, SwitchOnConstTable, SwitchOnStrucTable};

/// A single decoded WAM instruction (§4.3, §6).
///
/// One variant per [`Opcode`], carrying its typed operands. This is the
/// payload-bearing twin of `Opcode` — match on `Instruction` to execute or
/// print an instruction, match on `Opcode` (via [`Instruction::opcode`]) when
/// only the kind matters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    /// Builds a structure cell in `Ai` and switches the heap to write mode.
    ///
    /// | Operation | `heap[H] <- STR(H+1); heap[H+1] <- f/n; Ai <- heap[H]; H += 2` |
    /// | Syntax    | `put_struc f/n, Ai`                                            |
    /// | Encoding  | `0x01 mode reg f/n(4)`                                         |
    PutStruc {
        mode: AddrMode,
        reg: RegIndex,
        functor: FunctorRef,
    },

    /// Appends the next cell of a structure being built on the heap.
    ///
    /// In write mode: binds a fresh unbound variable at `heap[H]`, copies it
    /// into `Xn`. (§4.4 `set_var`)
    SetVar { mode: AddrMode, reg: RegIndex },

    /// Appends `Xn`'s value as the next cell of a structure being built.
    SetVal { mode: AddrMode, reg: RegIndex },

    /// Matches or builds a structure cell against `Ai` (§4.4 `get_struc`).
    ///
    /// | Operation | `match deref(Ai): REF -> bind to fresh STR, write mode; STR with matching f/n -> S := args, read mode; else -> FAIL` |
    /// | Syntax    | `get_struc f/n, Ai` |
    /// | Encoding  | `0x04 mode reg f/n(4)` |
    GetStruc {
        mode: AddrMode,
        reg: RegIndex,
        functor: FunctorRef,
    },

    /// Consumes the next cell of a matched structure, in read mode unifying
    /// with `Xn`, in write mode acting as `set_var` (§4.4).
    UnifyVar { mode: AddrMode, reg: RegIndex },

    /// Consumes the next cell of a matched structure, in read mode unifying
    /// with `Xn`, in write mode acting as `set_val` (§4.4).
    UnifyVal { mode: AddrMode, reg: RegIndex },

    /// Puts a fresh variable into `Ai`, remembering it in `Xn`/`Yn` (§4.3
    /// "Put", case: variable first seen in a goal argument).
    ///
    /// | Syntax   | `put_var Xn/Yn, Ai` |
    /// | Encoding | `0x07 mode var arg` |
    PutVar {
        mode: AddrMode,
        var: RegIndex,
        arg: RegIndex,
    },

    /// Copies a previously-seen variable's value into `Ai`.
    PutVal {
        mode: AddrMode,
        var: RegIndex,
        arg: RegIndex,
    },

    /// Matches or initializes `Xn`/`Yn` from `Ai` (head argument, first
    /// occurrence of a variable).
    GetVar {
        mode: AddrMode,
        var: RegIndex,
        arg: RegIndex,
    },

    /// Unifies `Ai` against a previously-bound `Xn`/`Yn`.
    GetVal {
        mode: AddrMode,
        var: RegIndex,
        arg: RegIndex,
    },

    /// Calls a user predicate, keeping a continuation (§4.3 "Control").
    ///
    /// | Operation | `CP <- next; trim E to k perm vars; P <- entry(f/n)` |
    /// | Syntax    | `call f/n, k` |
    /// | Encoding  | `0x0b target(4) arity k` |
    Call {
        target: CodeAddr,
        arity: u8,
        perm_vars_remaining: u8,
    },

    /// Returns control to `CP`.
    Proceed,

    /// Pushes a new environment frame holding `n` permanent variables
    /// (§4.4 `allocate`).
    AllocateN { n: u8 },

    /// Pops the current environment frame, restoring `E`/`CP`.
    Deallocate,

    /// First clause of a multi-clause predicate: push a choice point whose
    /// alternative is `target` (§4.3 "Choice", predicate compilation).
    TryMeElse { target: CodeAddr },

    /// A middle clause of a multi-clause predicate: retry with the
    /// alternative at `target` (restores state, advances `BP`).
    RetryMeElse { target: CodeAddr },

    /// Last clause of a multi-clause predicate: pops the current choice
    /// point, no further alternative.
    TrustMe,

    /// Like `put_struc`/`get_struc` but for an interned 0-arity constant.
    PutConst { mode: AddrMode, reg: RegIndex, constant: u32 },

    /// Matches `Ai` against a constant, binding if unbound.
    GetConst { mode: AddrMode, reg: RegIndex, constant: u32 },

    /// Appends a constant cell while building a structure.
    SetConst { constant: u32 },

    /// Consumes the next matched-structure cell, comparing against a
    /// constant.
    UnifyConst { constant: u32 },

    /// Builds a `LIS` cell in `Ai` (cons cell, two heap words follow).
    PutList { mode: AddrMode, reg: RegIndex },

    /// Matches or builds a `LIS` cell against `Ai`.
    GetList { mode: AddrMode, reg: RegIndex },

    /// Skips `k` anonymous argument cells while building a structure.
    SetVoid { count: u8 },

    /// Skips `k` anonymous argument cells of a matched structure.
    UnifyVoid { count: u8 },

    /// Tail call: like `call` but does not save `CP` (§4.4 "Last-call
    /// optimization").
    ///
    /// | Syntax   | `execute f/n` |
    /// | Encoding | `0x1a target(4) arity` |
    Execute { target: CodeAddr, arity: u8 },

    /// Legacy zero-operand form of `allocate`. The compiler in this crate
    /// never emits it — every clause with permanent variables emits
    /// `AllocateN` with an explicit count — but it decodes to an
    /// environment push with `n = 0`, so a hand-assembled program using it
    /// still runs (§9 Open Questions: kept as a documented, unused
    /// alternative rather than removed, to preserve round-trip decoding of
    /// the full opcode space named in §6).
    Allocate,

    /// Globalizes a permanent variable's reference before copying it into
    /// `Ai`, for its last occurrence in argument position of a call
    /// (§4.2 rule 5, §4.4 "bind rule").
    PutUnsafeVal {
        mode: AddrMode,
        var: RegIndex,
        arg: RegIndex,
    },

    /// Like `set_val` but globalizes a permanent variable first (§3
    /// invariant 6).
    SetLocalVal { mode: AddrMode, reg: RegIndex },

    /// Like `unify_val` but globalizes a permanent variable first.
    UnifyLocalVal { mode: AddrMode, reg: RegIndex },

    /// Indexed choice-point push, used under `switch_on_term` dispatch
    /// tables instead of `try_me_else` when only some clauses match.
    Try { target: CodeAddr },

    /// Indexed retry, the `switch_on_*` counterpart to `retry_me_else`.
    Retry { target: CodeAddr },

    /// Indexed trust, the `switch_on_*` counterpart to `trust_me`.
    Trust { target: CodeAddr },

    /// First-argument type dispatch (§4.3 "Optional first-argument
    /// indexing").
    ///
    /// | Operation | `match deref(A1): REF -> on_var; CON -> on_const; LIS -> on_list; STR -> on_struc` |
    /// | Encoding  | `0x22 on_var(4) on_const(4) on_list(4) on_struc(4)` |
    SwitchOnTerm {
        on_var: CodeAddr,
        on_const: CodeAddr,
        on_list: CodeAddr,
        on_struc: CodeAddr,
    },

    /// Hash dispatch on an interned constant (§4.3).
    SwitchOnConst(SwitchOnConstTable),

    /// Hash dispatch on a `name/arity` pair (§4.3).
    SwitchOnStruc(SwitchOnStrucTable),

    /// Prunes every choice point created since entry to the current clause's
    /// predicate (§4.3 "Cut"). `B <- B0`.
    NeckCut,

    /// Saves the current `B` into a permanent slot, to be restored later by
    /// `cut` (implements `!` deeper than the clause neck).
    GetLevel { reg: RegIndex },

    /// Restores `B` from a previously-saved cut barrier.
    Cut { reg: RegIndex },

    /// Unconditional jump to `target`. Used by the linker to stitch
    /// indexing chains together without falling through to unrelated code.
    Continue { target: CodeAddr },

    /// Does nothing; advances `P` past itself.
    NoOp,

    /// Calls into the built-in predicate table (conjunction/disjunction/cut
    /// helpers substituted by the pre-compiler, §4.4 item 4) rather than the
    /// user call table.
    CallInternal {
        builtin: CodeAddr,
        arity: u8,
        perm_vars_remaining: u8,
    },

    /// Yields the current bindings to the caller as a solution and parks,
    /// ready to resume search on the next `BACKTRACK` (§5 "Scheduling
    /// model").
    Suspend,
}

impl Instruction {
    /// The opcode tag of this instruction.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::PutStruc { .. } => Opcode::PutStruc,
            Self::SetVar { .. } => Opcode::SetVar,
            Self::SetVal { .. } => Opcode::SetVal,
            Self::GetStruc { .. } => Opcode::GetStruc,
            Self::UnifyVar { .. } => Opcode::UnifyVar,
            Self::UnifyVal { .. } => Opcode::UnifyVal,
            Self::PutVar { .. } => Opcode::PutVar,
            Self::PutVal { .. } => Opcode::PutVal,
            Self::GetVar { .. } => Opcode::GetVar,
            Self::GetVal { .. } => Opcode::GetVal,
            Self::Call { .. } => Opcode::Call,
            Self::Proceed => Opcode::Proceed,
            Self::AllocateN { .. } => Opcode::AllocateN,
            Self::Deallocate => Opcode::Deallocate,
            Self::TryMeElse { .. } => Opcode::TryMeElse,
            Self::RetryMeElse { .. } => Opcode::RetryMeElse,
            Self::TrustMe => Opcode::TrustMe,
            Self::PutConst { .. } => Opcode::PutConst,
            Self::GetConst { .. } => Opcode::GetConst,
            Self::SetConst { .. } => Opcode::SetConst,
            Self::UnifyConst { .. } => Opcode::UnifyConst,
            Self::PutList { .. } => Opcode::PutList,
            Self::GetList { .. } => Opcode::GetList,
            Self::SetVoid { .. } => Opcode::SetVoid,
            Self::UnifyVoid { .. } => Opcode::UnifyVoid,
            Self::Execute { .. } => Opcode::Execute,
            Self::Allocate => Opcode::Allocate,
            Self::PutUnsafeVal { .. } => Opcode::PutUnsafeVal,
            Self::SetLocalVal { .. } => Opcode::SetLocalVal,
            Self::UnifyLocalVal { .. } => Opcode::UnifyLocalVal,
            Self::Try { .. } => Opcode::Try,
            Self::Retry { .. } => Opcode::Retry,
            Self::Trust { .. } => Opcode::Trust,
            Self::SwitchOnTerm { .. } => Opcode::SwitchOnTerm,
            Self::SwitchOnConst(_) => Opcode::SwitchOnConst,
            Self::SwitchOnStruc(_) => Opcode::SwitchOnStruc,
            Self::NeckCut => Opcode::NeckCut,
            Self::GetLevel { .. } => Opcode::GetLevel,
            Self::Cut { .. } => Opcode::Cut,
            Self::Continue { .. } => Opcode::Continue,
            Self::NoOp => Opcode::NoOp,
            Self::CallInternal { .. } => Opcode::CallInternal,
            Self::Suspend => Opcode::Suspend,
        }
    }

    /// Total encoded length in bytes, including the opcode byte.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::SwitchOnConst(t) => t.encoded_len(),
            Self::SwitchOnStruc(t) => t.encoded_len(),
            other => other
                .opcode()
                .fixed_len()
                .expect("non-table opcodes have a fixed length"),
        }
    }
}

fn fmt_reg(f: &mut fmt::Formatter<'_>, mode: AddrMode, reg: RegIndex) -> fmt::Result {
    match mode {
        AddrMode::Reg => write!(f, "X{reg}"),
        AddrMode::Stack => write!(f, "Y{reg}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PutStruc { mode, reg, functor } => {
                write!(f, "put_struc {}/{}, ", functor.name(), functor.arity())?;
                fmt_reg(f, *mode, *reg)
            }
            Self::SetVar { mode, reg } => {
                f.write_str("set_var ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::SetVal { mode, reg } => {
                f.write_str("set_val ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::GetStruc { mode, reg, functor } => {
                write!(f, "get_struc {}/{}, ", functor.name(), functor.arity())?;
                fmt_reg(f, *mode, *reg)
            }
            Self::UnifyVar { mode, reg } => {
                f.write_str("unify_var ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::UnifyVal { mode, reg } => {
                f.write_str("unify_val ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::PutVar { mode, var, arg } => {
                f.write_str("put_var ")?;
                fmt_reg(f, *mode, *var)?;
                write!(f, ", A{arg}")
            }
            Self::PutVal { mode, var, arg } => {
                f.write_str("put_val ")?;
                fmt_reg(f, *mode, *var)?;
                write!(f, ", A{arg}")
            }
            Self::GetVar { mode, var, arg } => {
                f.write_str("get_var ")?;
                fmt_reg(f, *mode, *var)?;
                write!(f, ", A{arg}")
            }
            Self::GetVal { mode, var, arg } => {
                f.write_str("get_val ")?;
                fmt_reg(f, *mode, *var)?;
                write!(f, ", A{arg}")
            }
            Self::Call {
                target,
                arity,
                perm_vars_remaining,
            } => write!(f, "call {target}/{arity}, {perm_vars_remaining}"),
            Self::Proceed => f.write_str("proceed"),
            Self::AllocateN { n } => write!(f, "allocate {n}"),
            Self::Deallocate => f.write_str("deallocate"),
            Self::TryMeElse { target } => write!(f, "try_me_else {target}"),
            Self::RetryMeElse { target } => write!(f, "retry_me_else {target}"),
            Self::TrustMe => f.write_str("trust_me"),
            Self::PutConst { mode, reg, constant } => {
                write!(f, "put_const {constant}, ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::GetConst { mode, reg, constant } => {
                write!(f, "get_const {constant}, ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::SetConst { constant } => write!(f, "set_const {constant}"),
            Self::UnifyConst { constant } => write!(f, "unify_const {constant}"),
            Self::PutList { mode, reg } => {
                f.write_str("put_list ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::GetList { mode, reg } => {
                f.write_str("get_list ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::SetVoid { count } => write!(f, "set_void {count}"),
            Self::UnifyVoid { count } => write!(f, "unify_void {count}"),
            Self::Execute { target, arity } => write!(f, "execute {target}/{arity}"),
            Self::Allocate => f.write_str("allocate"),
            Self::PutUnsafeVal { mode, var, arg } => {
                f.write_str("put_unsafe_val ")?;
                fmt_reg(f, *mode, *var)?;
                write!(f, ", A{arg}")
            }
            Self::SetLocalVal { mode, reg } => {
                f.write_str("set_local_val ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::UnifyLocalVal { mode, reg } => {
                f.write_str("unify_local_val ")?;
                fmt_reg(f, *mode, *reg)
            }
            Self::Try { target } => write!(f, "try {target}"),
            Self::Retry { target } => write!(f, "retry {target}"),
            Self::Trust { target } => write!(f, "trust {target}"),
            Self::SwitchOnTerm {
                on_var,
                on_const,
                on_list,
                on_struc,
            } => write!(
                f,
                "switch_on_term {on_var}, {on_const}, {on_list}, {on_struc}"
            ),
            Self::SwitchOnConst(t) => write!(f, "switch_on_const <{} entries>", t.entries.len()),
            Self::SwitchOnStruc(t) => write!(f, "switch_on_struc <{} entries>", t.entries.len()),
            Self::NeckCut => f.write_str("neck_cut"),
            Self::GetLevel { reg } => write!(f, "get_level Y{reg}"),
            Self::Cut { reg } => write!(f, "cut Y{reg}"),
            Self::Continue { target } => write!(f, "continue {target}"),
            Self::NoOp => f.write_str("no_op"),
            Self::CallInternal {
                builtin,
                arity,
                perm_vars_remaining,
            } => write!(f, "call_internal {builtin}/{arity}, {perm_vars_remaining}"),
            Self::Suspend => f.write_str("suspend"),
        }
    }
}
