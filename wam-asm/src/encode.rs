//! Byte-code emitter (§4.5 "Byte-code Emitter").
//!
//! Each opcode has a fixed total byte length (or, for the two `switch_on_*`
//! variants, a length computed from its inline table). The emitter writes a
//! one-byte opcode followed by its fields in the order documented on
//! [`crate::Instruction`].

use alloc::vec::Vec;

use crate::{AddrMode, Instruction, SwitchOnConstTable, SwitchOnStrucTable};

fn push_reg(buf: &mut Vec<u8>, mode: AddrMode, reg: u8) {
    buf.push(mode.to_u8());
    buf.push(reg);
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Append the encoding of `instr` to `buf`. Returns the number of bytes
/// written, which always equals [`Instruction::encoded_len`].
pub fn emit(buf: &mut Vec<u8>, instr: &Instruction) -> usize {
    let start = buf.len();
    buf.push(instr.opcode().to_u8());

    match instr {
        Instruction::PutStruc { mode, reg, functor } | Instruction::GetStruc { mode, reg, functor } => {
            push_reg(buf, *mode, *reg);
            push_u32(buf, functor.to_u32());
        }
        Instruction::SetVar { mode, reg }
        | Instruction::SetVal { mode, reg }
        | Instruction::UnifyVar { mode, reg }
        | Instruction::UnifyVal { mode, reg }
        | Instruction::SetLocalVal { mode, reg }
        | Instruction::UnifyLocalVal { mode, reg }
        | Instruction::PutList { mode, reg }
        | Instruction::GetList { mode, reg } => {
            push_reg(buf, *mode, *reg);
        }
        Instruction::PutVar { mode, var, arg }
        | Instruction::PutVal { mode, var, arg }
        | Instruction::GetVar { mode, var, arg }
        | Instruction::GetVal { mode, var, arg }
        | Instruction::PutUnsafeVal { mode, var, arg } => {
            push_reg(buf, *mode, *var);
            buf.push(*arg);
        }
        Instruction::Call {
            target,
            arity,
            perm_vars_remaining,
        }
        | Instruction::CallInternal {
            builtin: target,
            arity,
            perm_vars_remaining,
        } => {
            push_u32(buf, *target);
            buf.push(*arity);
            buf.push(*perm_vars_remaining);
        }
        Instruction::Proceed
        | Instruction::Deallocate
        | Instruction::TrustMe
        | Instruction::NeckCut
        | Instruction::NoOp
        | Instruction::Suspend
        | Instruction::Allocate => {}
        Instruction::AllocateN { n } => buf.push(*n),
        Instruction::TryMeElse { target }
        | Instruction::RetryMeElse { target }
        | Instruction::Try { target }
        | Instruction::Retry { target }
        | Instruction::Trust { target }
        | Instruction::Continue { target } => push_u32(buf, *target),
        Instruction::PutConst { mode, reg, constant } | Instruction::GetConst { mode, reg, constant } => {
            push_reg(buf, *mode, *reg);
            push_u32(buf, *constant);
        }
        Instruction::SetConst { constant } | Instruction::UnifyConst { constant } => {
            push_u32(buf, *constant);
        }
        Instruction::SetVoid { count } | Instruction::UnifyVoid { count } => buf.push(*count),
        Instruction::Execute { target, arity } => {
            push_u32(buf, *target);
            buf.push(*arity);
        }
        Instruction::SwitchOnTerm {
            on_var,
            on_const,
            on_list,
            on_struc,
        } => {
            push_u32(buf, *on_var);
            push_u32(buf, *on_const);
            push_u32(buf, *on_list);
            push_u32(buf, *on_struc);
        }
        Instruction::SwitchOnConst(table) => emit_const_table(buf, table),
        Instruction::SwitchOnStruc(table) => emit_struc_table(buf, table),
        Instruction::GetLevel { reg } | Instruction::Cut { reg } => buf.push(*reg),
    }

    buf.len() - start
}

fn emit_const_table(buf: &mut Vec<u8>, table: &SwitchOnConstTable) {
    push_u32(buf, table.default);
    push_u32(buf, table.entries.len() as u32);
    for entry in &table.entries {
        push_u32(buf, entry.key);
        push_u32(buf, entry.target);
    }
}

fn emit_struc_table(buf: &mut Vec<u8>, table: &SwitchOnStrucTable) {
    push_u32(buf, table.default);
    push_u32(buf, table.entries.len() as u32);
    for entry in &table.entries {
        push_u32(buf, entry.key.to_u32());
        push_u32(buf, entry.target);
    }
}

/// Overwrite the 4-byte label/target field of a `try_me_else`,
/// `retry_me_else`, `call`, `execute`, `try`, `retry`, `trust` or `continue`
/// instruction already written to `buf` at `at` (the offset of its opcode
/// byte), with a now-resolved address. Used by the linker to patch forward
/// references (§4.5 "Forward references").
///
/// Returns `false` if the opcode at `at` has no patchable target field.
pub fn patch_target(buf: &mut [u8], at: usize, target: u32) -> bool {
    let Some(opcode) = buf.get(at).copied().and_then(crate::Opcode::from_u8) else {
        return false;
    };
    let field_offset = match opcode {
        crate::Opcode::TryMeElse
        | crate::Opcode::RetryMeElse
        | crate::Opcode::Try
        | crate::Opcode::Retry
        | crate::Opcode::Trust
        | crate::Opcode::Continue
        | crate::Opcode::Call
        | crate::Opcode::Execute
        | crate::Opcode::CallInternal => at + 1,
        _ => return false,
    };
    buf[field_offset..field_offset + 4].copy_from_slice(&target.to_be_bytes());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::disassemble;
    use crate::{AddrMode, FunctorRef};
    use rstest::rstest;

    #[rstest]
    #[case(Instruction::Proceed)]
    #[case(Instruction::Deallocate)]
    #[case(Instruction::NeckCut)]
    #[case(Instruction::TrustMe)]
    #[case(Instruction::PutStruc { mode: AddrMode::Reg, reg: 3, functor: FunctorRef::new(42, 2) })]
    #[case(Instruction::GetVar { mode: AddrMode::Stack, var: 1, arg: 2 })]
    #[case(Instruction::Call { target: 1000, arity: 2, perm_vars_remaining: 1 })]
    #[case(Instruction::SwitchOnTerm { on_var: 1, on_const: 2, on_list: 3, on_struc: 4 })]
    fn round_trips_through_bytes(#[case] instr: Instruction) {
        let mut buf = Vec::new();
        let len = emit(&mut buf, &instr);
        assert_eq!(len, instr.encoded_len());
        assert_eq!(buf.len(), len);
        let (decoded, consumed) = disassemble(&buf).expect("well-formed instruction decodes");
        assert_eq!(consumed, len);
        assert_eq!(decoded, instr);
    }

    #[test]
    fn patch_target_rewrites_call_site() {
        let mut buf = Vec::new();
        emit(&mut buf, &Instruction::Call { target: 0, arity: 1, perm_vars_remaining: 0 });
        assert!(patch_target(&mut buf, 0, 0xdead_beef));
        let (decoded, _) = disassemble(&buf).unwrap();
        assert_eq!(
            decoded,
            Instruction::Call { target: 0xdead_beef, arity: 1, perm_vars_remaining: 0 }
        );
    }
}
