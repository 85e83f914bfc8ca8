//! Error types (SPEC_FULL.md §3 "Ambient stack — Errors", spec.md §7).
//!
//! Three enums, the way `fuel_vm::error` keeps `InterpreterError`/
//! `RuntimeError` as plain `derive_more::Display` enums rather than
//! hand-written `impl Display`:
//!
//! - [`CompileError`] — spec.md §7 kind 2, fatal to the compilation unit.
//! - [`LinkError`] — spec.md §7 kind 3, fatal, reported with the unresolved
//!   `name/arity`.
//! - [`RuntimeError`] — splits into [`RuntimeError::Failure`] (drives
//!   `BACKTRACK`, not a reported error — see spec.md §7 kind 4) and
//!   [`RuntimeError::Invariant`] (kind 6, aborts execution).

use alloc::string::String;

use wam_types::FunctorId;

/// A clause or query could not be compiled (spec.md §7 kind 2).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CompileError {
    /// The head of a clause was not a functor (e.g. a bare variable or a
    /// list cell used where a predicate head is required).
    #[display(fmt = "clause head must be a functor, found {_0}")]
    HeadNotCallable(String),
    /// A body goal was not callable (e.g. a bare variable goal, which this
    /// implementation does not support — see `DESIGN.md`).
    #[display(fmt = "body goal must be callable, found {_0}")]
    GoalNotCallable(String),
    /// A clause, after disjunction expansion, exceeded the implementation's
    /// register budget (more temporary registers than
    /// `MachineConfig::register_count`).
    #[display(fmt = "clause requires {needed} registers, budget is {budget}")]
    RegisterBudgetExceeded { needed: usize, budget: usize },
}

/// A `call`/`execute` instruction names a predicate that is still unresolved
/// once compilation of the whole program completes (spec.md §7 kind 3, §3
/// "Call table").
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "unresolved predicate {name}/{arity}")]
pub struct LinkError {
    pub name: FunctorId,
    pub arity: u8,
}

impl core::error::Error for LinkError {}

/// Outcome of dispatching one instruction or running one query to
/// completion (spec.md §7 kinds 4 and 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RuntimeError {
    /// Unification failed, or a `call`/`execute` named an unlinked
    /// predicate. Not a reported error: the execution engine's state machine
    /// transitions to `BACKTRACK` (spec.md §4.4, §7 kind 4). Only surfaced to
    /// callers as "no (more) solutions" once the choice-point stack is
    /// exhausted.
    #[display(fmt = "unification failure")]
    Failure,
    /// A data-area bound was exceeded: heap, environment/choice-point stack,
    /// trail or PDL overflow.
    #[display(fmt = "{area} exhausted (capacity {capacity})")]
    ResourceExhausted { area: ResourceArea, capacity: usize },
    /// The dispatch loop encountered an opcode that does not exist, or a
    /// well-formed opcode whose operands violate a machine invariant (a
    /// corrupt heap tag read where only `REF`/`STR`/`CON`/`LIS` are valid,
    /// for instance). Treated as an internal error: abort, never silently
    /// ignored (spec.md §7 kind 6).
    #[display(fmt = "invariant violation: {_0}")]
    Invariant(&'static str),
}

impl core::error::Error for RuntimeError {}

/// Which bounded resource was exhausted, for
/// [`RuntimeError::ResourceExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, strum::EnumIter)]
pub enum ResourceArea {
    #[display(fmt = "heap")]
    Heap,
    #[display(fmt = "environment/choice-point stack")]
    Stack,
    #[display(fmt = "trail")]
    Trail,
    #[display(fmt = "PDL")]
    Pdl,
}

impl core::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use strum::IntoEnumIterator;

    #[test]
    fn every_resource_area_has_a_non_empty_display() {
        for area in ResourceArea::iter() {
            assert!(!area.to_string().is_empty());
        }
    }
}
