//! Disassembler (§4.5 "Disassembly is the inverse").

use alloc::vec::Vec;

use crate::{
    AddrMode, FunctorRef, Instruction, Opcode, SwitchOnConstTable, SwitchOnStrucTable, SwitchTableEntry,
};

/// A byte stream could not be decoded into a well-formed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DecodeError {
    /// Ran out of bytes partway through an instruction.
    #[display(fmt = "unexpected end of code buffer")]
    UnexpectedEof,
    /// The leading byte does not name any opcode.
    #[display(fmt = "unknown opcode byte {_0:#04x}")]
    UnknownOpcode(u8),
    /// An addressing-mode byte was neither `REG_ADDR` nor `STACK_ADDR`.
    #[display(fmt = "invalid addressing mode byte {_0:#04x}")]
    InvalidAddrMode(u8),
}

impl core::error::Error for DecodeError {}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn u8(&mut self) -> Result<u8, DecodeError> {
        let b = *self.bytes.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let end = self.pos + 4;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(u32::from_be_bytes(slice.try_into().expect("slice is 4 bytes")))
    }

    fn mode(&mut self) -> Result<AddrMode, DecodeError> {
        let b = self.u8()?;
        AddrMode::from_u8(b).ok_or(DecodeError::InvalidAddrMode(b))
    }
}

/// Decode a single instruction from the front of `bytes`.
///
/// Returns the instruction and the number of bytes it consumed, so the
/// caller can advance its own cursor by that amount (mirroring how the
/// interpreter advances `P`).
pub fn disassemble(bytes: &[u8]) -> Result<(Instruction, usize), DecodeError> {
    let mut c = Cursor { bytes, pos: 0 };
    let op_byte = c.u8()?;
    let opcode = Opcode::from_u8(op_byte).ok_or(DecodeError::UnknownOpcode(op_byte))?;

    let instr = match opcode {
        Opcode::PutStruc => {
            let mode = c.mode()?;
            let reg = c.u8()?;
            let functor = FunctorRef::from_u32(c.u32()?);
            Instruction::PutStruc { mode, reg, functor }
        }
        Opcode::GetStruc => {
            let mode = c.mode()?;
            let reg = c.u8()?;
            let functor = FunctorRef::from_u32(c.u32()?);
            Instruction::GetStruc { mode, reg, functor }
        }
        Opcode::SetVar => Instruction::SetVar { mode: c.mode()?, reg: c.u8()? },
        Opcode::SetVal => Instruction::SetVal { mode: c.mode()?, reg: c.u8()? },
        Opcode::UnifyVar => Instruction::UnifyVar { mode: c.mode()?, reg: c.u8()? },
        Opcode::UnifyVal => Instruction::UnifyVal { mode: c.mode()?, reg: c.u8()? },
        Opcode::SetLocalVal => Instruction::SetLocalVal { mode: c.mode()?, reg: c.u8()? },
        Opcode::UnifyLocalVal => Instruction::UnifyLocalVal { mode: c.mode()?, reg: c.u8()? },
        Opcode::PutList => Instruction::PutList { mode: c.mode()?, reg: c.u8()? },
        Opcode::GetList => Instruction::GetList { mode: c.mode()?, reg: c.u8()? },
        Opcode::PutVar => {
            let mode = c.mode()?;
            let var = c.u8()?;
            Instruction::PutVar { mode, var, arg: c.u8()? }
        }
        Opcode::PutVal => {
            let mode = c.mode()?;
            let var = c.u8()?;
            Instruction::PutVal { mode, var, arg: c.u8()? }
        }
        Opcode::GetVar => {
            let mode = c.mode()?;
            let var = c.u8()?;
            Instruction::GetVar { mode, var, arg: c.u8()? }
        }
        Opcode::GetVal => {
            let mode = c.mode()?;
            let var = c.u8()?;
            Instruction::GetVal { mode, var, arg: c.u8()? }
        }
        Opcode::PutUnsafeVal => {
            let mode = c.mode()?;
            let var = c.u8()?;
            Instruction::PutUnsafeVal { mode, var, arg: c.u8()? }
        }
        Opcode::Call => {
            let target = c.u32()?;
            let arity = c.u8()?;
            Instruction::Call { target, arity, perm_vars_remaining: c.u8()? }
        }
        Opcode::CallInternal => {
            let target = c.u32()?;
            let arity = c.u8()?;
            Instruction::CallInternal { builtin: target, arity, perm_vars_remaining: c.u8()? }
        }
        Opcode::Proceed => Instruction::Proceed,
        Opcode::AllocateN => Instruction::AllocateN { n: c.u8()? },
        Opcode::Allocate => Instruction::Allocate,
        Opcode::Deallocate => Instruction::Deallocate,
        Opcode::TryMeElse => Instruction::TryMeElse { target: c.u32()? },
        Opcode::RetryMeElse => Instruction::RetryMeElse { target: c.u32()? },
        Opcode::TrustMe => Instruction::TrustMe,
        Opcode::Try => Instruction::Try { target: c.u32()? },
        Opcode::Retry => Instruction::Retry { target: c.u32()? },
        Opcode::Trust => Instruction::Trust { target: c.u32()? },
        Opcode::Continue => Instruction::Continue { target: c.u32()? },
        Opcode::PutConst => {
            let mode = c.mode()?;
            let reg = c.u8()?;
            Instruction::PutConst { mode, reg, constant: c.u32()? }
        }
        Opcode::GetConst => {
            let mode = c.mode()?;
            let reg = c.u8()?;
            Instruction::GetConst { mode, reg, constant: c.u32()? }
        }
        Opcode::SetConst => Instruction::SetConst { constant: c.u32()? },
        Opcode::UnifyConst => Instruction::UnifyConst { constant: c.u32()? },
        Opcode::SetVoid => Instruction::SetVoid { count: c.u8()? },
        Opcode::UnifyVoid => Instruction::UnifyVoid { count: c.u8()? },
        Opcode::Execute => {
            let target = c.u32()?;
            Instruction::Execute { target, arity: c.u8()? }
        }
        Opcode::SwitchOnTerm => Instruction::SwitchOnTerm {
            on_var: c.u32()?,
            on_const: c.u32()?,
            on_list: c.u32()?,
            on_struc: c.u32()?,
        },
        Opcode::SwitchOnConst => Instruction::SwitchOnConst(decode_const_table(&mut c)?),
        Opcode::SwitchOnStruc => Instruction::SwitchOnStruc(decode_struc_table(&mut c)?),
        Opcode::NeckCut => Instruction::NeckCut,
        Opcode::GetLevel => Instruction::GetLevel { reg: c.u8()? },
        Opcode::Cut => Instruction::Cut { reg: c.u8()? },
        Opcode::NoOp => Instruction::NoOp,
        Opcode::Suspend => Instruction::Suspend,
    };

    Ok((instr, c.pos))
}

fn decode_const_table(c: &mut Cursor<'_>) -> Result<SwitchOnConstTable, DecodeError> {
    let default = c.u32()?;
    let count = c.u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = c.u32()?;
        let target = c.u32()?;
        entries.push(SwitchTableEntry { key, target });
    }
    Ok(SwitchOnConstTable { default, entries })
}

fn decode_struc_table(c: &mut Cursor<'_>) -> Result<SwitchOnStrucTable, DecodeError> {
    let default = c.u32()?;
    let count = c.u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = FunctorRef::from_u32(c.u32()?);
        let target = c.u32()?;
        entries.push(SwitchTableEntry { key, target });
    }
    Ok(SwitchOnStrucTable { default, entries })
}

/// Decode every instruction in `bytes` in sequence, stopping at the first
/// error or once the buffer is exhausted.
pub fn disassemble_all(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (instr, consumed) = disassemble(&bytes[pos..])?;
        pos += consumed;
        out.push(instr);
    }
    Ok(out)
}
