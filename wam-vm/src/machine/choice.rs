//! Choice-point frames (spec.md §3 "Choice-point frame", §4.4 `try_me_else`/
//! `retry_me_else`/`trust_me`/`try`/`retry`/`trust`).
//!
//! See `environment.rs` for why this crate keeps the choice-point stack as
//! its own `Vec` rather than fusing it with the environment stack.

use alloc::vec::Vec;

use wam_types::{Addr, CodeAddr};

use crate::heap::Cell;

/// One choice-point frame: enough state to retry the next alternative
/// exactly as the spec's layout names it, except `A₁…Aₙ` is saved as the
/// *entire* register file rather than just the first `n` — the `try_me_else`/
/// `retry_me_else` encoding carries no arity operand (spec.md §6), so there
/// is no way for the engine to know `n` without also threading call arity
/// through the choice instructions. Saving the whole file costs a few extra
/// words per choice point and is observably identical, since only the
/// registers a resumed clause's own head instructions read are ever
/// inspected (see `DESIGN.md`).
#[derive(Debug, Clone)]
pub struct ChoicePoint {
    pub saved_registers: Vec<Cell>,
    pub e: Option<usize>,
    pub cp: Option<CodeAddr>,
    /// Next alternative's code address — the label a future `BACKTRACK`
    /// jumps `P` to. Updated in place by `retry_me_else`/`retry`.
    pub bp: CodeAddr,
    /// Trail length at creation, restored on backtrack into this frame.
    pub tr: usize,
    /// Heap top at creation (`HB` while this is the current choice point).
    pub h: Addr,
    /// Environment-stack length at creation, truncated back to on backtrack
    /// so frames allocated by the now-abandoned branch are reclaimed.
    pub env_len: usize,
}
