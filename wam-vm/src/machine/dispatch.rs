//! Instruction dispatch (spec.md §4.4 "Instruction semantics") and the
//! `{RUN, BACKTRACK, HALT_SUCCESS, HALT_FAIL}` state machine (spec.md §4.4
//! "State machine of the execution loop").

use wam_asm::{AddrMode, Instruction};
use wam_types::{Addr, CodeAddr, UNRESOLVED};

use super::choice::ChoicePoint;
use super::environment::Environment;
use super::unify::unbound_at;
use super::Machine;
use crate::error::{ResourceArea, RuntimeError};
use crate::heap::{Cell, NO_CHOICE_POINT};

/// The execution loop's state (spec.md §4.4). [`Machine::step`] only ever
/// returns [`ExecState::Run`], [`ExecState::Backtrack`] or
/// [`ExecState::HaltSuccess`] — `HaltFail` is a driver-level conclusion
/// reached once [`Machine::backtrack`] finds no choice point left to try
/// (see [`super::solve::Solutions`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Run,
    Backtrack,
    HaltSuccess,
    HaltFail,
}

impl Machine {
    /// Execute the instruction at `P`, advancing `P` past it first (so a
    /// jump instruction's own handler can simply overwrite `P` again without
    /// tracking whether the fetch already moved it).
    #[tracing::instrument(name = "step", skip(self))]
    pub(crate) fn step(&mut self) -> Result<ExecState, RuntimeError> {
        let (instr, len) = wam_asm::disassemble(&self.code[self.p as usize..])
            .map_err(|_| RuntimeError::Invariant("unknown or truncated opcode at P"))?;
        self.p += len as CodeAddr;
        tracing::trace!("Instruction: {instr}");

        use Instruction::*;
        match instr {
            PutStruc { mode, reg, functor } => {
                let str_addr = self.h;
                self.push_heap(Cell::Str(str_addr + 1))?;
                self.push_heap(Cell::Functor(functor))?;
                self.write_reg(mode, reg, Cell::Str(str_addr));
                self.write_mode = true;
            }
            SetVar { mode, reg } => {
                let addr = self.h;
                self.push_heap(unbound_at(addr))?;
                self.write_reg(mode, reg, Cell::Ref(addr));
            }
            SetVal { mode, reg } | SetLocalVal { mode, reg } => {
                let v = self.read_reg(mode, reg);
                self.push_heap(v)?;
            }
            GetStruc { mode, reg, functor } => {
                let resolved = self.deref_cell(self.read_reg(mode, reg));
                match resolved {
                    Cell::Ref(addr) => {
                        let str_addr = self.h;
                        self.push_heap(Cell::Str(str_addr + 1))?;
                        self.push_heap(Cell::Functor(functor))?;
                        self.bind(addr, Cell::Str(str_addr))?;
                        self.write_mode = true;
                        self.s = Some(str_addr + 2);
                    }
                    Cell::Str(s) => match self.heap[s as usize] {
                        Cell::Functor(f) if f == functor => {
                            self.s = Some(s + 1);
                            self.write_mode = false;
                        }
                        Cell::Functor(_) => return Ok(ExecState::Backtrack),
                        _ => return Err(RuntimeError::Invariant("STR cell did not point at a functor descriptor")),
                    },
                    Cell::Con(n) if functor.arity() == 0 && n == functor.name() => {
                        self.write_mode = false;
                        self.s = None;
                    }
                    _ => return Ok(ExecState::Backtrack),
                }
            }
            UnifyVar { mode, reg } => {
                if self.write_mode {
                    let addr = self.h;
                    self.push_heap(unbound_at(addr))?;
                    self.write_reg(mode, reg, Cell::Ref(addr));
                } else {
                    let s = self.s.expect("unify_var in read mode with no S");
                    let v = self.heap[s as usize];
                    self.write_reg(mode, reg, v);
                    self.s = Some(s + 1);
                }
            }
            UnifyVal { mode, reg } | UnifyLocalVal { mode, reg } => {
                if self.write_mode {
                    let v = self.read_reg(mode, reg);
                    self.push_heap(v)?;
                } else {
                    let s = self.s.expect("unify_val in read mode with no S");
                    let cell = self.heap[s as usize];
                    let v = self.read_reg(mode, reg);
                    self.s = Some(s + 1);
                    if !self.unify(v, cell)? {
                        return Ok(ExecState::Backtrack);
                    }
                }
            }
            PutVar { mode, var, arg } => {
                let addr = self.h;
                self.push_heap(unbound_at(addr))?;
                self.write_reg(mode, var, Cell::Ref(addr));
                self.write_reg(AddrMode::Reg, arg, Cell::Ref(addr));
            }
            PutVal { mode, var, arg } | PutUnsafeVal { mode, var, arg } => {
                let v = self.read_reg(mode, var);
                self.write_reg(AddrMode::Reg, arg, v);
            }
            GetVar { mode, var, arg } => {
                let v = self.read_reg(AddrMode::Reg, arg);
                self.write_reg(mode, var, v);
            }
            GetVal { mode, var, arg } => {
                let a = self.read_reg(AddrMode::Reg, arg);
                let v = self.read_reg(mode, var);
                if !self.unify(a, v)? {
                    return Ok(ExecState::Backtrack);
                }
            }
            Call { target, arity: _, perm_vars_remaining: _ } => {
                if target == UNRESOLVED {
                    return Ok(ExecState::Backtrack);
                }
                self.cp = Some(self.p);
                self.b0 = self.b;
                self.p = target;
            }
            Proceed => {
                self.p = self.cp.expect("proceed with no continuation");
            }
            AllocateN { n } => self.allocate_environment(n)?,
            Allocate => self.allocate_environment(0)?,
            Deallocate => {
                let idx = self.e.expect("deallocate with no environment");
                let prev_e = self.env_stack[idx].prev_e;
                let cp = self.env_stack[idx].cp;
                self.env_stack.truncate(idx);
                self.e = prev_e;
                self.cp = cp;
            }
            TryMeElse { target } => self.push_choice_point(target)?,
            RetryMeElse { target } => {
                self.do_retry_restore();
                let b = self.b.expect("retry_me_else with no choice point");
                self.choice_stack[b].bp = target;
            }
            TrustMe => self.pop_choice_point(),
            PutConst { mode, reg, constant } => self.write_reg(mode, reg, Cell::Con(constant)),
            GetConst { mode, reg, constant } => {
                let a = self.read_reg(mode, reg);
                if !self.unify(a, Cell::Con(constant))? {
                    return Ok(ExecState::Backtrack);
                }
            }
            SetConst { constant } => {
                self.push_heap(Cell::Con(constant))?;
            }
            UnifyConst { constant } => {
                if self.write_mode {
                    self.push_heap(Cell::Con(constant))?;
                } else {
                    let s = self.s.expect("unify_const in read mode with no S");
                    let v = self.heap[s as usize];
                    self.s = Some(s + 1);
                    if !self.unify(v, Cell::Con(constant))? {
                        return Ok(ExecState::Backtrack);
                    }
                }
            }
            PutList { mode, reg } => {
                let addr = self.h;
                self.write_reg(mode, reg, Cell::Lis(addr));
            }
            GetList { mode, reg } => {
                let resolved = self.deref_cell(self.read_reg(mode, reg));
                match resolved {
                    Cell::Ref(addr) => {
                        let pair_addr = self.h;
                        self.bind(addr, Cell::Lis(pair_addr))?;
                        self.s = Some(pair_addr);
                        self.write_mode = true;
                    }
                    Cell::Lis(l) => {
                        self.s = Some(l);
                        self.write_mode = false;
                    }
                    _ => return Ok(ExecState::Backtrack),
                }
            }
            SetVoid { count } => {
                for _ in 0..count {
                    let addr = self.h;
                    self.push_heap(unbound_at(addr))?;
                }
            }
            UnifyVoid { count } => {
                if self.write_mode {
                    for _ in 0..count {
                        let addr = self.h;
                        self.push_heap(unbound_at(addr))?;
                    }
                } else {
                    let s = self.s.expect("unify_void in read mode with no S");
                    self.s = Some(s + count as Addr);
                }
            }
            Execute { target, arity: _ } | CallInternal { builtin: target, arity: _, perm_vars_remaining: _ } => {
                if target == UNRESOLVED {
                    return Ok(ExecState::Backtrack);
                }
                self.b0 = self.b;
                self.p = target;
            }
            Try { target } => {
                self.push_choice_point(self.p)?;
                self.p = target;
            }
            Retry { target } => {
                self.do_retry_restore();
                let b = self.b.expect("retry with no choice point");
                self.choice_stack[b].bp = self.p;
                self.p = target;
            }
            Trust { target } => {
                self.pop_choice_point();
                self.p = target;
            }
            SwitchOnTerm { on_var, on_const, on_list, on_struc } => {
                let a1 = self.deref_cell(self.read_reg(AddrMode::Reg, 1));
                self.p = match a1 {
                    Cell::Ref(_) => on_var,
                    Cell::Con(_) => on_const,
                    Cell::Lis(_) => on_list,
                    Cell::Str(_) => on_struc,
                    Cell::Functor(_) | Cell::Barrier(_) => {
                        return Err(RuntimeError::Invariant("A1 held a non-term cell at switch_on_term"))
                    }
                };
            }
            SwitchOnConst(table) => {
                let a1 = self.deref_cell(self.read_reg(AddrMode::Reg, 1));
                self.p = match a1 {
                    Cell::Con(n) => table.lookup(n),
                    _ => table.default,
                };
            }
            SwitchOnStruc(table) => {
                let a1 = self.deref_cell(self.read_reg(AddrMode::Reg, 1));
                self.p = match a1 {
                    Cell::Str(s) => match self.heap[s as usize] {
                        Cell::Functor(f) => table.lookup(f),
                        _ => table.default,
                    },
                    _ => table.default,
                };
            }
            NeckCut => self.do_cut(self.b0),
            GetLevel { reg } => {
                let barrier = self.b0.map(|i| i as Addr).unwrap_or(NO_CHOICE_POINT);
                self.write_reg(AddrMode::Stack, reg, Cell::Barrier(barrier));
            }
            Cut { reg } => {
                let slot = self.read_reg(AddrMode::Stack, reg);
                let target = match slot {
                    Cell::Barrier(v) if v == NO_CHOICE_POINT => None,
                    Cell::Barrier(v) => Some(v as usize),
                    _ => return Err(RuntimeError::Invariant("cut: slot did not hold a cut barrier")),
                };
                self.do_cut(target);
            }
            Continue { target } => self.p = target,
            NoOp => {}
            Suspend => return Ok(ExecState::HaltSuccess),
        }
        Ok(ExecState::Run)
    }

    fn allocate_environment(&mut self, n: u8) -> Result<(), RuntimeError> {
        if self.env_stack.len() + self.choice_stack.len() >= self.config.stack_size {
            return Err(RuntimeError::ResourceExhausted { area: ResourceArea::Stack, capacity: self.config.stack_size });
        }
        let env = Environment { prev_e: self.e, cp: self.cp, slots: alloc::vec![Cell::Ref(0); n as usize] };
        self.env_stack.push(env);
        self.e = Some(self.env_stack.len() - 1);
        Ok(())
    }

    fn push_choice_point(&mut self, bp: CodeAddr) -> Result<(), RuntimeError> {
        if self.env_stack.len() + self.choice_stack.len() >= self.config.stack_size {
            return Err(RuntimeError::ResourceExhausted { area: ResourceArea::Stack, capacity: self.config.stack_size });
        }
        let cp = ChoicePoint {
            saved_registers: self.registers.clone(),
            e: self.e,
            cp: self.cp,
            bp,
            tr: self.trail.len(),
            h: self.h,
            env_len: self.env_stack.len(),
        };
        self.choice_stack.push(cp);
        self.b = Some(self.choice_stack.len() - 1);
        self.hb = self.h;
        Ok(())
    }

    fn pop_choice_point(&mut self) {
        self.do_retry_restore();
        let b = self.b.expect("trust/trust_me with no choice point");
        self.choice_stack.truncate(b);
        self.b = if b == 0 { None } else { Some(b - 1) };
        self.hb = self.b.map(|i| self.choice_stack[i].h).unwrap_or(0);
    }

    /// Common restore step shared by `retry_me_else`/`trust_me`/`retry`/
    /// `trust`: discard any choice points pushed since this one (the
    /// now-abandoned attempt's own nested choices), unbind the trail back to
    /// this choice point's mark, and restore `H`/`E`/`CP`/registers (spec.md
    /// §4.4 "Backtracking").
    fn do_retry_restore(&mut self) {
        let b = self.b.expect("retry restore with no choice point");
        self.choice_stack.truncate(b + 1);
        let cpnt = self.choice_stack[b].clone();
        for &addr in self.trail[cpnt.tr..].iter() {
            self.heap[addr as usize] = Cell::Ref(addr);
        }
        self.trail.truncate(cpnt.tr);
        self.heap.truncate(cpnt.h as usize);
        self.h = cpnt.h;
        self.env_stack.truncate(cpnt.env_len);
        self.e = cpnt.e;
        self.cp = cpnt.cp;
        self.registers.copy_from_slice(&cpnt.saved_registers);
    }

    /// `neck_cut`/`cut`: prune every choice point created since `target`
    /// (spec.md §4.3 "Cut"). Unlike backtracking, cut never unbinds the
    /// trail — the bindings made by the (now irrevocably committed) goals
    /// since `target` must remain undoable by whatever choice point is still
    /// older than `target`, so only `B`/`HB` move and the now-unreachable
    /// choice-point frames are physically dropped (see `DESIGN.md`: this
    /// implementation deviates from a literal reading of "trim trail" in
    /// spec.md §4.4 for `neck_cut`/`cut`, which would make those bindings
    /// permanently unrestorable and violate trail correctness, spec.md §8).
    fn do_cut(&mut self, target: Option<usize>) {
        self.b = target;
        self.choice_stack.truncate(target.map_or(0, |i| i + 1));
        self.hb = self.b.map(|i| self.choice_stack[i].h).unwrap_or(0);
    }

    /// Resume search after a reported solution, or after an explicit
    /// failure: jump to the current choice point's alternative. `false` if
    /// none remains (`HALT_FAIL`, spec.md §4.4).
    pub(crate) fn backtrack(&mut self) -> bool {
        match self.b {
            None => {
                tracing::debug!("backtrack: choice-point stack exhausted");
                false
            }
            Some(b) => {
                tracing::debug!(alternative = self.choice_stack[b].bp, "backtrack: resuming alternative");
                self.p = self.choice_stack[b].bp;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Linker;

    /// spec.md §8 "Trail correctness": every address bound since a choice
    /// point was created becomes self-`Ref` again once that choice point is
    /// retried into, and no other cell is touched.
    #[test]
    fn retry_restore_undoes_every_binding_made_since_the_choice_point() {
        let mut m = Machine::new(Linker::new().link().unwrap());
        m.heap.extend([Cell::Ref(0), Cell::Ref(1), Cell::Ref(2)]);
        m.h = 3;
        m.push_choice_point(0).unwrap();
        m.bind(0, Cell::Con(10)).unwrap();
        m.bind(1, Cell::Con(20)).unwrap();
        assert_eq!(m.heap[0], Cell::Con(10));
        assert_eq!(m.heap[1], Cell::Con(20));
        assert_eq!(m.heap[2], Cell::Ref(2), "untouched cell stays untouched");

        m.do_retry_restore();

        assert_eq!(m.heap[0], Cell::Ref(0));
        assert_eq!(m.heap[1], Cell::Ref(1));
        assert_eq!(m.heap[2], Cell::Ref(2));
        assert!(m.trail.is_empty());
    }

    /// spec.md §8 "Cut correctness": cutting to a given level discards every
    /// choice point created after it, leaving the earlier one(s) intact.
    #[test]
    fn do_cut_discards_every_choice_point_past_the_target_level() {
        let mut m = Machine::new(Linker::new().link().unwrap());
        m.push_choice_point(0).unwrap(); // level 0, survives the cut below
        let target = m.b;
        m.push_choice_point(0).unwrap(); // level 1, pruned
        m.push_choice_point(0).unwrap(); // level 2, pruned
        assert_eq!(m.choice_stack.len(), 3);

        m.do_cut(target);

        assert_eq!(m.b, target);
        assert_eq!(m.choice_stack.len(), 1);
    }
}
