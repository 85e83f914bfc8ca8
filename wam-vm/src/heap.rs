//! Tagged heap cell model (spec.md §3 "Data model").
//!
//! The spec leaves the choice between a 32-bit packed word and a wider
//! representation open ("32-bit is sufficient for the bit layouts below");
//! this crate stores a [`Cell`] as a small enum rather than a packed
//! integer, so the tag is enforced by the type system instead of by bit
//! masking at every access site — the packed `(tag, value)` layout of §3 and
//! §6 is still what [`Cell::tag`]/the encoder would produce if serialized,
//! and is exercised directly by the `wam-asm` round-trip tests for
//! `FunctorRef`'s `(arity << 24) | name` packing.
//!
//! Tag values, resolving spec.md §9's open question (the L0/L1 sub-machines
//! in the original used `REF = 0x01`; the WAM subsystem used `REF = 0x00`):
//! this implementation adopts the **WAM** convention globally — `REF = 0x00`,
//! `STR = 0x01`, `CON = 0x02`, `LIS = 0x03` — recorded in `DESIGN.md` and
//! exercised by the structure-matching end-to-end scenario (spec.md §8
//! scenario 3).

use wam_types::{Addr, FunctorId};

use wam_asm::FunctorRef;

/// The four heap cell tags (spec.md §3, §6 "Tag nibbles").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Reference/variable cell. Self-referential means unbound.
    Ref = 0x00,
    /// Structure marker, pointing at the functor-descriptor cell that
    /// follows.
    Str = 0x01,
    /// Constant atom (an interned 0-arity functor id).
    Con = 0x02,
    /// List pair, pointing at the (head, tail) cell pair.
    Lis = 0x03,
}

/// One tagged heap word (spec.md §3).
///
/// [`Cell::Functor`] is not one of the four tagged kinds named by the spec:
/// it is the untagged `(arity << 24) | name` descriptor word that
/// immediately follows a `Str` cell's target address, stored as its own
/// heap slot so the arena stays a flat `Vec<Cell>` rather than mixing tagged
/// and raw-`u32` representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Ref(Addr),
    Str(Addr),
    Con(FunctorId),
    Lis(Addr),
    Functor(FunctorRef),
    /// A saved choice-point depth (`get_level`/`cut`'s cut barrier). Not one
    /// of the four tagged kinds named by the spec: `get_level`/`cut` address
    /// a permanent slot the same way any other `Yₙ` is addressed, but the
    /// value they save is a machine-internal coordinate, never a term, and
    /// is never the subject of `deref`/`unify` (see `DESIGN.md`). `None`
    /// (no choice point, i.e. the bottom of the choice-point stack) is
    /// stored as `u32::MAX`.
    Barrier(Addr),
}

/// Sentinel stored in [`Cell::Barrier`] for "no choice point" (the bottom of
/// the choice-point stack, `B = None`).
pub const NO_CHOICE_POINT: Addr = Addr::MAX;

impl Cell {
    /// The cell's tag, for cells that carry one of the four tagged kinds.
    /// `None` for [`Cell::Functor`], which is never the target of a
    /// `deref`.
    pub const fn tag(self) -> Option<Tag> {
        match self {
            Cell::Ref(_) => Some(Tag::Ref),
            Cell::Str(_) => Some(Tag::Str),
            Cell::Con(_) => Some(Tag::Con),
            Cell::Lis(_) => Some(Tag::Lis),
            Cell::Functor(_) => None,
            Cell::Barrier(_) => None,
        }
    }

    /// `true` if this cell is an unbound variable pointing at `at_addr`
    /// (self-reference, spec.md §3 invariant 2).
    pub fn is_unbound_at(self, at_addr: Addr) -> bool {
        matches!(self, Cell::Ref(a) if a == at_addr)
    }
}
