//! Externally Visible Architectural State.
//!
//! `ArchState` is everything a program could observe about a processing
//! element at a pause boundary: its program counter, register file, retired
//! instruction count and the memory references it has issued but not yet
//! seen complete. It survives a core switch untouched.

use super::gpr::Gpr;
use crate::common::{AccessType, Tick};

/// Bytes per instruction used to advance the program counter.
pub const INST_BYTES: u64 = 4;

/// A memory reference issued by an element that has not yet completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRef {
    /// Physical address of the reference.
    pub addr: u64,
    /// Read or write.
    pub kind: AccessType,
    /// Tick at which the response arrives.
    pub ready_at: Tick,
}

/// Architectural state of one processing element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchState {
    /// Next instruction to execute.
    pub pc: u64,
    pub regs: Gpr,
    /// Instructions retired since reset, across all variants.
    pub retired: u64,
    /// Memory references issued but not yet complete.
    pub in_flight: Vec<MemRef>,
}

impl ArchState {
    /// Creates architectural state starting execution at `pc`.
    pub fn new(pc: u64) -> Self {
        Self {
            pc,
            ..Default::default()
        }
    }

    /// Retires `count` sequential instructions.
    pub fn retire(&mut self, count: u64) {
        self.retired += count;
        self.pc = self.pc.wrapping_add(count * INST_BYTES);
    }

    /// Records a memory reference as outstanding.
    pub fn issue(&mut self, mem_ref: MemRef) {
        self.in_flight.push(mem_ref);
    }

    /// Drops every reference whose response has arrived by `now`.
    pub fn complete_until(&mut self, now: Tick) {
        self.in_flight.retain(|r| r.ready_at > now);
    }
}
