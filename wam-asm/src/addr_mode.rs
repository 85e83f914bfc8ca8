/// Disambiguates whether a register field names a temporary/argument
/// register `Xn` or a permanent environment slot `Yn` (§4.2, §6
/// "Addressing modes").
///
/// Every `get_*`/`put_*`/`set_*`/`unify_*` instruction carries one of these
/// alongside its register index byte; the instruction semantics are
/// identical either way; only where the register lives differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AddrMode {
    /// `Xn` temporary or argument register.
    Reg = 0x01,
    /// `Yn` permanent variable slot in the current environment frame.
    Stack = 0x02,
}

impl AddrMode {
    /// Recover an `AddrMode` from its encoded byte.
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Reg),
            0x02 => Some(Self::Stack),
            _ => None,
        }
    }

    /// Encode as a single byte.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}
