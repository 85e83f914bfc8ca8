//! Primitive types shared by the WAM assembler (`wam-asm`) and the
//! interpreter (`wam-vm`).
//!
//! This crate carries no logic: it exists so the two layers above it agree on
//! the width of a register index, a heap address and an interned symbol id
//! without either one owning the other's definition.

#![cfg_attr(not(feature = "std"), no_std)]

/// Machine word. Used for heap cell payloads and decoded immediate values.
pub type Word = u64;

/// Index of an `Xn` temporary/argument register or a `Yn` permanent stack
/// slot. The addressing mode (`REG_ADDR` vs `STACK_ADDR`) that disambiguates
/// which is carried alongside it in the instruction encoding (see
/// `wam_asm::AddrMode`).
pub type RegIndex = u8;

/// Byte offset into the code buffer. `!0` (all bits set) is the link-time
/// sentinel for "not yet resolved" (§3 "Call table").
pub type CodeAddr = u32;

/// Sentinel written into a `CodeAddr` field for a call table entry that has
/// not been resolved yet.
pub const UNRESOLVED: CodeAddr = CodeAddr::MAX;

/// Interned id of a functor name (arity is carried separately wherever a
/// functor is referenced, since the same name can be used at different
/// arities).
pub type FunctorId = u32;

/// Interned id of a source-level variable name. Not used once compiled: it
/// only appears in the boundary between the external term model and the
/// register allocator.
pub type VarId = u32;

/// Absolute offset into the heap/stack/trail data area (§3 "Memory layout").
pub type Addr = u32;
