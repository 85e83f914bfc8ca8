//! Compiler and abstract-machine runtime for a Prolog-like Horn-clause
//! language: the Warren Abstract Machine described by this workspace's
//! specification.
//!
//! Layering, leaf-first (mirrors `fuel-types` -> `fuel-asm` -> `fuel-vm`):
//! [`wam_types`] for shared primitives, [`wam_asm`] for the instruction set
//! and byte encoding, this crate for everything else — the tagged heap
//! ([`heap`]), the term model and reference interner ([`term`],
//! [`interner`]), the compiler pipeline ([`compiler`]), the two-pass linker
//! ([`linker`]) and the execution engine ([`machine`]).
//!
//! A typical session: build a [`term::Term`] tree for each clause and the
//! query, hand them to [`compiler::compile_predicate_def`]/
//! [`compiler::place_query_goal`] against a shared [`linker::Linker`], call
//! [`linker::Linker::link`] once every predicate is defined, then drive a
//! [`machine::Machine`] over the linked [`linker::Program`] with
//! [`machine::Machine::run`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod compiler;
pub mod consts;
pub mod error;
pub mod heap;
pub mod interner;
pub mod linker;
pub mod machine;
pub mod term;

pub use consts::MachineConfig;
pub use error::{CompileError, LinkError, ResourceArea, RuntimeError};
pub use interner::{Interner, SymbolTable};
pub use linker::{Linker, Program};
pub use machine::{Machine, Solution, Solutions};
pub use term::{Clause, Goal, Query, RawGoal, Term};

pub use wam_asm::{self, disassemble, AddrMode, Instruction, Opcode};
pub use wam_types::{self, Addr, CodeAddr, FunctorId, VarId, Word};
