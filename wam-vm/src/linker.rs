//! Two-pass linker (spec.md §3 "Call table", §7 kind 3).
//!
//! Instructions are emitted into a flat code buffer as clauses/predicates
//! compile, with every `call`/`execute` target written as
//! [`wam_types::UNRESOLVED`] and recorded as a pending fixup keyed by
//! `name/arity`. [`Linker::link`] resolves every fixup against the call
//! table built up by [`Linker::define_predicate`], the way a conventional
//! two-pass assembler defers forward references (mirrors `fuel_asm::encode`
//! write-then-patch, generalized from a single buffer position to a table of
//! named entry points).

use alloc::{collections::BTreeMap, vec::Vec};

use wam_asm::{encode, Instruction};
use wam_types::{CodeAddr, FunctorId};

use crate::error::LinkError;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PredicateKey {
    name: FunctorId,
    arity: u8,
}

/// A forward reference still waiting for its target to be known: the byte
/// offset of the `call`/`execute` instruction's opcode, and the predicate it
/// names.
struct PendingCall {
    at: CodeAddr,
    name: FunctorId,
    arity: u8,
}

/// Accumulates emitted code and the call table while a program compiles.
#[derive(Default)]
pub struct Linker {
    code: Vec<u8>,
    call_table: BTreeMap<PredicateKey, CodeAddr>,
    pending: Vec<PendingCall>,
}

/// The outcome of [`Linker::link`]: a flat code buffer ready for the
/// execution engine, plus the entry address of `name/arity` for launching a
/// query against a previously compiled program.
pub struct Program {
    pub code: Vec<u8>,
    pub call_table: BTreeMap<(FunctorId, u8), CodeAddr>,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current end of the code buffer, i.e. the address the next `emit`
    /// call will return.
    pub fn here(&self) -> CodeAddr {
        self.code.len() as CodeAddr
    }

    /// Append one instruction, returning the address it was placed at.
    pub fn emit(&mut self, instr: &Instruction) -> CodeAddr {
        let at = self.here();
        encode::emit(&mut self.code, instr);
        at
    }

    /// Patch a previously emitted `try_me_else`/`retry_me_else`/`try`/
    /// `retry`/`switch_on_*` target once the address it should jump to is
    /// known (spec.md §4.3 "Predicate compilation").
    pub fn patch(&mut self, at: CodeAddr, target: CodeAddr) {
        let ok = encode::patch_target(&mut self.code, at, target);
        debug_assert!(ok, "patch target did not point at a patchable instruction");
    }

    /// Register one `call`/`execute` instruction at `at` as needing its
    /// target resolved to `name/arity`'s entry point once linking completes.
    pub fn record_call_site(&mut self, at: CodeAddr, name: FunctorId, arity: u8) {
        self.pending.push(PendingCall { at, name, arity });
    }

    /// Record `name/arity`'s entry point (the address of its first clause's
    /// choice instruction, or of the clause body directly if there is only
    /// one clause, or of the `switch_on_term` dispatcher if first-argument
    /// indexing was used).
    pub fn define_predicate(&mut self, name: FunctorId, arity: u8, entry: CodeAddr) {
        tracing::debug!(name, arity, entry, "linker: defined predicate");
        self.call_table.insert(PredicateKey { name, arity }, entry);
    }

    /// Look up an already-defined predicate's entry point, for call sites
    /// compiled after their callee (most programs compile all of a module's
    /// predicates before building any query against them).
    pub fn entry_of(&self, name: FunctorId, arity: u8) -> Option<CodeAddr> {
        self.call_table.get(&PredicateKey { name, arity }).copied()
    }

    /// Resolve every pending call against the call table, failing with the
    /// first unresolved `name/arity` found (spec.md §7 kind 3).
    pub fn link(mut self) -> Result<Program, LinkError> {
        for pending in &self.pending {
            let key = PredicateKey { name: pending.name, arity: pending.arity };
            let target = self.call_table.get(&key).copied().ok_or_else(|| {
                let err = LinkError { name: pending.name, arity: pending.arity };
                tracing::warn!(%err, "linker: unresolved predicate at end of compilation");
                err
            })?;
            let ok = encode::patch_target(&mut self.code, pending.at, target);
            debug_assert!(ok, "call site did not point at a patchable instruction");
        }
        let call_table = self.call_table.into_iter().map(|(k, v)| ((k.name, k.arity), v)).collect();
        Ok(Program { code: self.code, call_table })
    }
}
