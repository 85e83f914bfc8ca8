use wam_types::FunctorId;

/// A `name/arity` pair packed the way the heap stores a structure's functor
/// descriptor cell: `(arity << 24) | name` (§3 "A structure on the heap").
///
/// Instructions that name a functor (`put_struc`, `get_struc`) carry one of
/// these as their 4-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctorRef {
    name: FunctorId,
    arity: u8,
}

impl FunctorRef {
    /// Functor ids must fit in 24 bits to share the heap cell's value field.
    pub const MAX_NAME: FunctorId = 0x00ff_ffff;

    /// Build a functor reference. Panics if `name` does not fit in 24 bits;
    /// callers go through the interner, whose ids are guaranteed to fit
    /// (§4.1 contract).
    pub const fn new(name: FunctorId, arity: u8) -> Self {
        assert!(name <= Self::MAX_NAME, "functor id does not fit in 24 bits");
        Self { name, arity }
    }

    /// The interned functor name.
    pub const fn name(self) -> FunctorId {
        self.name
    }

    /// The functor's arity.
    pub const fn arity(self) -> u8 {
        self.arity
    }

    /// Pack into the `(arity << 24) | name` representation.
    pub const fn to_u32(self) -> u32 {
        ((self.arity as u32) << 24) | self.name
    }

    /// Unpack from the `(arity << 24) | name` representation.
    pub const fn from_u32(word: u32) -> Self {
        Self {
            name: word & Self::MAX_NAME,
            arity: (word >> 24) as u8,
        }
    }
}

impl From<FunctorRef> for u32 {
    fn from(f: FunctorRef) -> u32 {
        f.to_u32()
    }
}

impl From<u32> for FunctorRef {
    fn from(word: u32) -> Self {
        Self::from_u32(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u32() {
        let f = FunctorRef::new(0x00ab_cdef, 3);
        assert_eq!(FunctorRef::from_u32(f.to_u32()), f);
    }

    #[test]
    fn arity_occupies_top_byte() {
        let f = FunctorRef::new(1, 0xff);
        assert_eq!(f.to_u32() >> 24, 0xff);
    }
}
