//! Machine configuration and sizing constants (SPEC_FULL.md §3 "Ambient
//! stack — Configuration").
//!
//! There is no network or file configuration surface here: the "configuration"
//! a WAM has is the set of capacities for its data area, mirroring the way
//! `fuel_vm::consts` names `VM_MAX_RAM`/`VM_REGISTER_COUNT` as plain
//! constants and bundles overridable limits into a config struct passed to
//! the interpreter at construction.

/// Default number of argument/temporary registers (`X1..Xn`) available to a
/// single clause. §4.2 allocates these starting at 1; this is a generous
/// ceiling, not a per-program requirement.
pub const DEFAULT_REGISTER_COUNT: usize = 256;

/// Default heap capacity, in cells (§3 "Memory layout").
pub const DEFAULT_HEAP_SIZE: usize = 1 << 20;

/// Default combined environment/choice-point stack capacity, in words.
pub const DEFAULT_STACK_SIZE: usize = 1 << 18;

/// Default trail capacity, in entries (§3 "Trail").
pub const DEFAULT_TRAIL_SIZE: usize = 1 << 16;

/// Default PDL (push-down list) capacity used by `unify` (§4.4).
pub const DEFAULT_PDL_SIZE: usize = 1 << 12;

/// Overridable capacities for one [`crate::machine::Machine`] instance.
///
/// Passed to `Machine::new`; the compiled code area and call/symbol tables
/// are unaffected by this (they are owned by the linker, not the machine, and
/// survive a `reset`, see SPEC_FULL.md §3 "Ambient stack").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Register file size (`X1..Xn`).
    pub register_count: usize,
    /// Heap capacity, in cells.
    pub heap_size: usize,
    /// Environment/choice-point stack capacity, in words.
    pub stack_size: usize,
    /// Trail capacity, in entries.
    pub trail_size: usize,
    /// PDL capacity.
    pub pdl_size: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            register_count: DEFAULT_REGISTER_COUNT,
            heap_size: DEFAULT_HEAP_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
            trail_size: DEFAULT_TRAIL_SIZE,
            pdl_size: DEFAULT_PDL_SIZE,
        }
    }
}
