//! Peephole optimizer (SPEC_FULL.md §4 "supplemented feature, implemented
//! not stubbed"): collapses runs of adjacent `set_void`/`unify_void`
//! instructions — one per anonymous variable or singleton, emitted
//! independently by [`crate::compiler::emit`] — into a single instruction
//! carrying the combined count, the way a real WAM assembler merges
//! anonymous-argument skips rather than emitting one opcode per `_`.

use alloc::{vec, vec::Vec};

use wam_asm::Instruction;

use crate::compiler::clause::{CallSite, CompiledClause};

/// Merge adjacent void runs in a plain instruction vector with no call
/// sites to remap (a fully compiled, already-placed query or standalone
/// instruction sequence).
pub fn optimize(instructions: Vec<Instruction>) -> Vec<Instruction> {
    merge_voids(instructions, &mut Vec::new())
}

/// Merge adjacent void runs in a compiled clause, remapping its call
/// sites' instruction indices to match the shortened sequence (spec.md §4.3
/// "Set"/"Unify" families; call targets are patched by address once placed,
/// but the call-site table is keyed by pre-placement instruction index and
/// must track any index shift here).
pub fn optimize_clause(clause: CompiledClause) -> CompiledClause {
    let mut remap = vec![0usize; clause.instructions.len() + 1];
    let instructions = merge_voids(clause.instructions, &mut remap);
    let call_sites = clause
        .call_sites
        .into_iter()
        .map(|site| CallSite { instr_index: remap[site.instr_index], ..site })
        .collect();
    CompiledClause { instructions, call_sites }
}

/// Walk `instructions` once, replacing every maximal run of
/// `SetVoid`/`UnifyVoid` with a single instruction of the same kind whose
/// count is the run's total. `remap[i]` (if non-empty) is filled with the
/// output index that input index `i` lands on (a dropped instruction in the
/// middle of a run maps to the run's single surviving instruction).
fn merge_voids(instructions: Vec<Instruction>, remap: &mut Vec<usize>) -> Vec<Instruction> {
    let track = !remap.is_empty();
    let mut out = Vec::with_capacity(instructions.len());
    let mut i = 0;
    while i < instructions.len() {
        match &instructions[i] {
            Instruction::SetVoid { .. } => {
                let (total, consumed) = run_len(&instructions, i, |ins| match ins {
                    Instruction::SetVoid { count } => Some(*count),
                    _ => None,
                });
                if track {
                    for j in i..i + consumed {
                        remap[j] = out.len();
                    }
                }
                out.push(Instruction::SetVoid { count: total });
                i += consumed;
            }
            Instruction::UnifyVoid { .. } => {
                let (total, consumed) = run_len(&instructions, i, |ins| match ins {
                    Instruction::UnifyVoid { count } => Some(*count),
                    _ => None,
                });
                if track {
                    for j in i..i + consumed {
                        remap[j] = out.len();
                    }
                }
                out.push(Instruction::UnifyVoid { count: total });
                i += consumed;
            }
            _ => {
                if track {
                    remap[i] = out.len();
                }
                out.push(instructions[i].clone());
                i += 1;
            }
        }
    }
    if track {
        remap[instructions.len()] = out.len();
    }
    out
}

fn run_len(instructions: &[Instruction], start: usize, as_count: impl Fn(&Instruction) -> Option<u8>) -> (u8, usize) {
    let mut total: u8 = 0;
    let mut n = 0;
    while let Some(count) = instructions.get(start + n).and_then(|ins| as_count(ins)) {
        total = total.saturating_add(count);
        n += 1;
    }
    (total, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_set_voids() {
        let instrs = alloc::vec![
            Instruction::SetVoid { count: 1 },
            Instruction::SetVoid { count: 1 },
            Instruction::SetVoid { count: 1 },
            Instruction::SetConst { constant: 7 },
        ];
        let merged = optimize(instrs);
        assert_eq!(merged, alloc::vec![Instruction::SetVoid { count: 3 }, Instruction::SetConst { constant: 7 }]);
    }

    #[test]
    fn leaves_non_void_instructions_untouched() {
        let instrs = alloc::vec![Instruction::Proceed];
        assert_eq!(optimize(instrs.clone()), instrs);
    }

    #[test]
    fn remaps_call_site_index_across_a_collapsed_run() {
        let instrs = alloc::vec![
            Instruction::UnifyVoid { count: 1 },
            Instruction::UnifyVoid { count: 1 },
            Instruction::Execute { target: wam_types::UNRESOLVED, arity: 1 },
        ];
        let clause = CompiledClause {
            instructions: instrs,
            call_sites: alloc::vec![CallSite { instr_index: 2, name: 9, arity: 1 }],
        };
        let optimized = optimize_clause(clause);
        assert_eq!(optimized.instructions.len(), 2);
        assert_eq!(optimized.call_sites[0].instr_index, 1);
    }
}
