//! Instruction set, byte encoding and disassembler for the Warren Abstract
//! Machine described in this workspace's specification.
//!
//! This crate only knows about bytes and opcodes: it has no notion of a
//! heap, a unification algorithm or a compiler. Those live in `wam-vm`,
//! which depends on this crate the way `fuel-vm` depends on `fuel-asm`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod addr_mode;
mod functor;
mod instruction;
mod opcode;
mod switch_table;

pub mod decode;
pub mod encode;

pub use addr_mode::AddrMode;
pub use functor::FunctorRef;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use switch_table::{SwitchOnConstTable, SwitchOnStrucTable, SwitchTableEntry};

pub use decode::{disassemble, DecodeError};
pub use encode::emit;

pub use wam_types::{Addr, CodeAddr, FunctorId, RegIndex, Word, UNRESOLVED};
