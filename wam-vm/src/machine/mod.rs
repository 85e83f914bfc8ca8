//! The execution engine (spec.md §1 "THE CORE", §4.4, §5).
//!
//! Mirrors the shape of `fuel_vm::Interpreter`: one struct holding every
//! piece of mutable machine state, with its behaviour spread across sibling
//! files that each contribute an `impl Machine` block — `unify.rs`
//! (dereference/bind/unify), `choice.rs`/`environment.rs` (the frame types),
//! `dispatch.rs` (the instruction interpreter and the `{Run, Backtrack,
//! HaltSuccess, HaltFail}` state machine of spec.md §4.4) and `solve.rs` (the
//! solution iterator and `decode`).
//!
//! A `Machine` owns its data area (heap, registers, environment/choice-point
//! stacks, trail, PDL) privately; the compiled code, call table and interner
//! are supplied externally and outlive any single query (spec.md §5 "shared
//! resources").

mod choice;
mod dispatch;
mod environment;
mod solve;
mod unify;

pub use dispatch::ExecState;
pub use solve::{Solution, Solutions};

use alloc::vec;
use alloc::vec::Vec;

use wam_types::{Addr, CodeAddr, RegIndex};

use self::choice::ChoicePoint;
use self::environment::Environment;
use crate::consts::MachineConfig;
use crate::error::{ResourceArea, RuntimeError};
use crate::heap::Cell;
use crate::linker::Program;

/// The abstract machine: compiled code plus a private, resettable data area
/// (spec.md §3 "Memory layout", §7 "Machine state").
pub struct Machine {
    pub(crate) config: MachineConfig,
    pub(crate) code: Vec<u8>,
    pub(crate) call_table: alloc::collections::BTreeMap<(wam_types::FunctorId, u8), CodeAddr>,

    pub(crate) heap: Vec<Cell>,
    pub(crate) registers: Vec<Cell>,
    pub(crate) env_stack: Vec<Environment>,
    pub(crate) choice_stack: Vec<ChoicePoint>,
    pub(crate) trail: Vec<Addr>,
    pub(crate) pdl: Vec<(Cell, Cell)>,

    // Internal registers (spec.md §3 "Internal registers").
    pub(crate) h: Addr,
    pub(crate) hb: Addr,
    pub(crate) s: Option<Addr>,
    pub(crate) p: CodeAddr,
    pub(crate) cp: Option<CodeAddr>,
    pub(crate) e: Option<usize>,
    pub(crate) b: Option<usize>,
    pub(crate) b0: Option<usize>,
    pub(crate) write_mode: bool,
}

impl Machine {
    /// Build a machine around a linked [`Program`] with default capacities
    /// (SPEC_FULL.md §3 "Configuration").
    pub fn new(program: Program) -> Self {
        Self::with_config(program, MachineConfig::default())
    }

    /// Build a machine with overridden data-area capacities.
    pub fn with_config(program: Program, config: MachineConfig) -> Self {
        let mut m = Self {
            config,
            code: program.code,
            call_table: program.call_table,
            heap: Vec::with_capacity(config.heap_size.min(1024)),
            registers: vec![Cell::Ref(0); config.register_count + 1],
            env_stack: Vec::new(),
            choice_stack: Vec::new(),
            trail: Vec::new(),
            pdl: Vec::new(),
            h: 0,
            hb: 0,
            s: None,
            p: 0,
            cp: None,
            e: None,
            b: None,
            b0: None,
            write_mode: false,
        };
        m.reset_data_area();
        m
    }

    /// Clear all mutable per-query state — heap, stacks, trail, registers,
    /// internal registers — while preserving the compiled code area and call
    /// table (spec.md §5 "Ordering guarantees": "programs survive across
    /// queries").
    pub fn reset(&mut self) {
        self.reset_data_area();
    }

    fn reset_data_area(&mut self) {
        self.heap.clear();
        for r in &mut self.registers {
            *r = Cell::Ref(0);
        }
        self.env_stack.clear();
        self.choice_stack.clear();
        self.trail.clear();
        self.pdl.clear();
        self.h = 0;
        self.hb = 0;
        self.s = None;
        self.p = 0;
        self.cp = None;
        self.e = None;
        self.b = None;
        self.b0 = None;
        self.write_mode = false;
    }

    /// Run `query` from scratch, returning a pull-based iterator over its
    /// solutions (spec.md §6 `run(query) → iterator of solutions`, §9
    /// "iterators over solutions are modeled as a pull-based generator").
    /// Resets the machine's data area first: a `Machine` runs one query at a
    /// time (spec.md §5 "Scheduling model").
    pub fn run(&mut self, entry: CodeAddr, var_slots: Vec<wam_types::VarId>) -> Solutions<'_> {
        self.reset();
        self.p = entry;
        Solutions::new(self, var_slots)
    }

    pub fn config(&self) -> MachineConfig {
        self.config
    }

    fn read_reg(&self, mode: wam_asm::AddrMode, idx: RegIndex) -> Cell {
        match mode {
            wam_asm::AddrMode::Reg => self.registers[idx as usize],
            wam_asm::AddrMode::Stack => {
                let e = self.e.expect("Yn access with no environment");
                self.env_stack[e].slots[idx as usize - 1]
            }
        }
    }

    fn write_reg(&mut self, mode: wam_asm::AddrMode, idx: RegIndex, value: Cell) {
        match mode {
            wam_asm::AddrMode::Reg => self.registers[idx as usize] = value,
            wam_asm::AddrMode::Stack => {
                let e = self.e.expect("Yn access with no environment");
                self.env_stack[e].slots[idx as usize - 1] = value;
            }
        }
    }

    fn push_heap(&mut self, cell: Cell) -> Result<Addr, RuntimeError> {
        if self.heap.len() >= self.config.heap_size {
            return Err(RuntimeError::ResourceExhausted { area: ResourceArea::Heap, capacity: self.config.heap_size });
        }
        let addr = self.heap.len() as Addr;
        self.heap.push(cell);
        self.h = self.heap.len() as Addr;
        Ok(addr)
    }

    fn push_trail(&mut self, addr: Addr) -> Result<(), RuntimeError> {
        if self.trail.len() >= self.config.trail_size {
            return Err(RuntimeError::ResourceExhausted { area: ResourceArea::Trail, capacity: self.config.trail_size });
        }
        self.trail.push(addr);
        Ok(())
    }
}
