//! Term model and clause/query syntax (spec.md §2 item 2, §4.1).
//!
//! This is the external collaborator the spec treats as out of scope for
//! *parsing*, but SPEC_FULL.md §2 gives it a minimal concrete shape so the
//! compiler and machine are exercisable end-to-end without a parser: a
//! caller builds a [`Term`] tree directly (or a future parser crate could
//! build the same tree and hand it to [`crate::compiler`]).

use alloc::{boxed::Box, vec::Vec};

use wam_types::{FunctorId, VarId};

/// A first-order term: a logic variable or a functor application
/// (`Functor(name, args)`; an atom is a functor with zero args, a list cell
/// is the two-argument functor conventionally named `'.'/2` but see
/// [`Term::cons`]/[`Term::nil`] for the dedicated list sugar this crate
/// recognizes so the compiler can choose `put_list`/`get_list` over
/// `put_struc`/`get_struc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// An unbound source-level variable, identified by the interner's id.
    Var(VarId),
    /// `name(args[0], args[1], ...)`. `args.is_empty()` is an atom.
    Functor { name: FunctorId, args: Vec<Term> },
    /// `[head | tail]`, kept distinct from a general 2-ary functor so the
    /// compiler can emit the dedicated `put_list`/`get_list` instructions
    /// (spec.md §4.3) instead of `put_struc`/`get_struc` with a reserved
    /// functor id.
    Cons(Box<Term>, Box<Term>),
    /// `[]`, the empty list constant.
    Nil,
}

impl Term {
    /// Build an atom (0-arity functor).
    pub fn atom(name: FunctorId) -> Self {
        Term::Functor { name, args: Vec::new() }
    }

    /// Build a compound term.
    pub fn compound(name: FunctorId, args: Vec<Term>) -> Self {
        Term::Functor { name, args }
    }

    /// `[head | tail]`.
    pub fn cons(head: Term, tail: Term) -> Self {
        Term::Cons(Box::new(head), Box::new(tail))
    }

    /// Build a proper list `[items[0], items[1], ..., ]` terminated by
    /// `tail` (`Term::Nil` for a proper list).
    pub fn list(items: Vec<Term>, tail: Term) -> Self {
        items.into_iter().rev().fold(tail, |acc, item| Term::cons(item, acc))
    }

    /// The functor arity of this term as it would appear at a clause head or
    /// goal position: `0` for a variable, atom or `Nil`/`Cons` (lists have
    /// their own instruction family and are not addressed by arity).
    pub fn arity(&self) -> u8 {
        match self {
            Term::Functor { args, .. } => args.len() as u8,
            _ => 0,
        }
    }

    /// The functor name, if this term is directly callable as a predicate
    /// head/goal (a plain functor application).
    pub fn functor_name(&self) -> Option<FunctorId> {
        match self {
            Term::Functor { name, .. } => Some(*name),
            _ => None,
        }
    }
}

/// One body goal, after the pre-compiler has substituted built-ins with
/// dedicated nodes (spec.md §2 item 4, §4.6 step 2). A raw parser-facing
/// goal tree ([`RawGoal`]) is flattened into a `Vec<Goal>` per clause
/// alternative by [`crate::compiler::precompile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    /// An ordinary user predicate call.
    Call(Term),
    /// `!` — prune alternatives back to the clause's entry choice point
    /// (spec.md §4.3 "Cut").
    Cut,
}

/// The raw goal tree a caller supplies for a clause body, before the
/// pre-compiler resolves conjunction/disjunction into a flat
/// `Vec<Vec<Goal>>` (spec.md §2 item 4 "Pre-compiler").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawGoal {
    Call(Term),
    Cut,
    /// `A, B` — both must hold.
    Conjunction(Box<RawGoal>, Box<RawGoal>),
    /// `A ; B` — either may hold; expanded into separate clause
    /// alternatives by the pre-compiler (spec.md §4.6 step 2).
    Disjunction(Box<RawGoal>, Box<RawGoal>),
}

/// One clause as handed to the compiler after pre-compilation: a head and a
/// flat conjunction of goals (spec.md §2 item 2 "a possibly empty body
/// sequence of functors joined by conjunction").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Term,
    pub body: Vec<Goal>,
}

impl Clause {
    /// A fact: a head with no body.
    pub fn fact(head: Term) -> Self {
        Self { head, body: Vec::new() }
    }
}

/// A top-level query: a flat conjunction of goals with no head (spec.md §6
/// "compile(clause_or_query)").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub goals: Vec<Goal>,
}
