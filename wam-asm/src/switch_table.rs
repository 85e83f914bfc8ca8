use alloc::vec::Vec;

use wam_types::CodeAddr;

use crate::FunctorRef;

/// One row of a `switch_on_const`/`switch_on_struc` jump table: key value to
/// match against, and the label to jump to on a match (§4.3 "Optional
/// first-argument indexing").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchTableEntry<K> {
    pub key: K,
    pub target: CodeAddr,
}

/// Inline hash table carried by a `switch_on_const` instruction: dispatches
/// on an interned constant id (§4.3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchOnConstTable {
    /// Jumped to when `A1` is not `CON` or matches no entry.
    pub default: CodeAddr,
    pub entries: Vec<SwitchTableEntry<u32>>,
}

/// Inline hash table carried by a `switch_on_struc` instruction: dispatches
/// on a `name/arity` pair (§4.3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchOnStrucTable {
    /// Jumped to when `A1` is not `STR` or matches no entry.
    pub default: CodeAddr,
    pub entries: Vec<SwitchTableEntry<FunctorRef>>,
}

impl SwitchOnConstTable {
    /// Total encoded length in bytes, including the opcode byte (§6 "9+table").
    pub fn encoded_len(&self) -> usize {
        9 + self.entries.len() * 8
    }

    pub fn lookup(&self, key: u32) -> CodeAddr {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.target)
            .unwrap_or(self.default)
    }
}

impl SwitchOnStrucTable {
    /// Total encoded length in bytes, including the opcode byte (§6 "9+table").
    pub fn encoded_len(&self) -> usize {
        9 + self.entries.len() * 8
    }

    pub fn lookup(&self, key: FunctorRef) -> CodeAddr {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.target)
            .unwrap_or(self.default)
    }
}
