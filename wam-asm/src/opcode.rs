use core::fmt;

/// The tag byte of an encoded instruction (§6 "Instruction encoding").
///
/// This is the fieldless twin of [`crate::Instruction`], the way
/// `fuel_asm::OpcodeRepr` sits next to `fuel_asm::Opcode` — useful for
/// matching on the instruction kind without destructuring its operands, and
/// for reporting the opcode of a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    PutStruc = 0x01,
    SetVar = 0x02,
    SetVal = 0x03,
    GetStruc = 0x04,
    UnifyVar = 0x05,
    UnifyVal = 0x06,
    PutVar = 0x07,
    PutVal = 0x08,
    GetVar = 0x09,
    GetVal = 0x0a,
    Call = 0x0b,
    Proceed = 0x0c,
    AllocateN = 0x0d,
    Deallocate = 0x0e,
    TryMeElse = 0x0f,
    RetryMeElse = 0x10,
    TrustMe = 0x11,
    PutConst = 0x12,
    GetConst = 0x13,
    SetConst = 0x14,
    UnifyConst = 0x15,
    PutList = 0x16,
    GetList = 0x17,
    SetVoid = 0x18,
    UnifyVoid = 0x19,
    Execute = 0x1a,
    Allocate = 0x1b,
    PutUnsafeVal = 0x1c,
    SetLocalVal = 0x1d,
    UnifyLocalVal = 0x1e,
    Try = 0x1f,
    Retry = 0x20,
    Trust = 0x21,
    SwitchOnTerm = 0x22,
    SwitchOnConst = 0x23,
    SwitchOnStruc = 0x24,
    NeckCut = 0x25,
    GetLevel = 0x26,
    Cut = 0x27,
    Continue = 0x28,
    NoOp = 0x29,
    CallInternal = 0x2a,
    Suspend = 0x7f,
}

impl Opcode {
    /// Recover an opcode from its encoded byte.
    pub const fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => Self::PutStruc,
            0x02 => Self::SetVar,
            0x03 => Self::SetVal,
            0x04 => Self::GetStruc,
            0x05 => Self::UnifyVar,
            0x06 => Self::UnifyVal,
            0x07 => Self::PutVar,
            0x08 => Self::PutVal,
            0x09 => Self::GetVar,
            0x0a => Self::GetVal,
            0x0b => Self::Call,
            0x0c => Self::Proceed,
            0x0d => Self::AllocateN,
            0x0e => Self::Deallocate,
            0x0f => Self::TryMeElse,
            0x10 => Self::RetryMeElse,
            0x11 => Self::TrustMe,
            0x12 => Self::PutConst,
            0x13 => Self::GetConst,
            0x14 => Self::SetConst,
            0x15 => Self::UnifyConst,
            0x16 => Self::PutList,
            0x17 => Self::GetList,
            0x18 => Self::SetVoid,
            0x19 => Self::UnifyVoid,
            0x1a => Self::Execute,
            0x1b => Self::Allocate,
            0x1c => Self::PutUnsafeVal,
            0x1d => Self::SetLocalVal,
            0x1e => Self::UnifyLocalVal,
            0x1f => Self::Try,
            0x20 => Self::Retry,
            0x21 => Self::Trust,
            0x22 => Self::SwitchOnTerm,
            0x23 => Self::SwitchOnConst,
            0x24 => Self::SwitchOnStruc,
            0x25 => Self::NeckCut,
            0x26 => Self::GetLevel,
            0x27 => Self::Cut,
            0x28 => Self::Continue,
            0x29 => Self::NoOp,
            0x2a => Self::CallInternal,
            0x7f => Self::Suspend,
            _ => return None,
        })
    }

    /// Encode as a single byte.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// The fixed byte length of this opcode's encoding, including the
    /// opcode byte itself, for every opcode whose length does not depend on
    /// an inline table (§6). `switch_on_const`/`switch_on_struc` return
    /// `None`: their length depends on the number of table entries, see
    /// [`crate::SwitchOnConstTable`]/[`crate::SwitchOnStrucTable`].
    pub const fn fixed_len(self) -> Option<usize> {
        use Opcode::*;
        Some(match self {
            PutStruc | GetStruc => 7,
            SetVar | SetVal => 3,
            UnifyVar | UnifyVal => 3,
            PutVar | PutVal | GetVar | GetVal | PutUnsafeVal => 4,
            Call | CallInternal => 7,
            Proceed | Deallocate | TrustMe | NeckCut | NoOp | Suspend | Allocate => 1,
            AllocateN => 2,
            TryMeElse | RetryMeElse => 5,
            PutConst | GetConst => 7,
            SetConst | UnifyConst => 5,
            PutList | GetList => 3,
            SetVoid | UnifyVoid => 2,
            Execute => 6,
            SetLocalVal | UnifyLocalVal => 3,
            Try | Retry | Trust => 5,
            SwitchOnTerm => 17,
            SwitchOnConst | SwitchOnStruc => return None,
            GetLevel | Cut => 2,
            Continue => 5,
        })
    }

    /// `true` for the choice-creating/retrying instructions (§4.3 "Choice").
    pub const fn is_choice(self) -> bool {
        matches!(
            self,
            Self::TryMeElse
                | Self::RetryMeElse
                | Self::TrustMe
                | Self::Try
                | Self::Retry
                | Self::Trust
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_opcode_round_trips_through_its_byte() {
        for op in Opcode::iter() {
            assert_eq!(Opcode::from_u8(op.to_u8()), Some(op));
        }
    }
}
