//! Environment frames (spec.md §3 "Environment frame", §4.4 `allocate`/
//! `deallocate`).
//!
//! The spec fuses the environment and choice-point stacks into one area so a
//! single growing-upward address range serves both. This implementation
//! keeps them as two separate `Vec`s instead (see `choice.rs` docs for the
//! choice-point side) — each frame kind is addressed by its own index rather
//! than a byte offset into a shared region. Both still behave as true LIFO
//! stacks: `allocate`/`deallocate` and choice-point push/pop only ever touch
//! the top, so the two-`Vec` split is observably identical to the fused
//! layout, just without raw pointer arithmetic across frame kinds.

use alloc::vec::Vec;

use wam_types::CodeAddr;

use crate::heap::Cell;

/// One environment frame (spec.md §3): the previous frame's index, the
/// continuation saved at `allocate` time, and the permanent variables
/// themselves. `N` (slot 2 of the spec's layout) is `slots.len()`, trimmed in
/// place by `call`/`execute`'s `k` operand rather than kept as a separate
/// field.
#[derive(Debug, Clone)]
pub struct Environment {
    pub prev_e: Option<usize>,
    pub cp: Option<CodeAddr>,
    pub slots: Vec<Cell>,
}
