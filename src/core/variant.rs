//! Core Variants.
//!
//! A core variant is one performance profile of a processing element: the
//! execution model plus the structural sizes that bound how much work it can
//! keep in flight. Variants are plain data; the timing they imply is derived
//! here rather than inherited from a base CPU type.

use crate::common::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integer registers that are architectural rather than available for renaming.
const ARCH_INT_REGS: usize = 32;

/// Window size at which an out-of-order core reaches half its issue width.
const WINDOW_KNEE: f64 = 16.0;

/// Sustained IPC of host-native fast-forward execution.
const KVM_IPC: f64 = 4.0;

/// Execution model of a core variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuModel {
    /// Host-native fast-forward; no timing fidelity.
    Kvm,
    /// Functional execution with atomic memory accesses.
    Atomic,
    /// Single-issue in-order core with timed memory accesses.
    Timing,
    /// Pipelined in-order core.
    Minor,
    /// Out-of-order core.
    O3,
}

impl CpuModel {
    /// Returns `true` for models used to fast-forward rather than measure.
    pub fn is_functional(self) -> bool {
        matches!(self, CpuModel::Kvm | CpuModel::Atomic)
    }
}

impl FromStr for CpuModel {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "kvm" => Ok(CpuModel::Kvm),
            "atomic" => Ok(CpuModel::Atomic),
            "timing" => Ok(CpuModel::Timing),
            "minor" => Ok(CpuModel::Minor),
            "o3" => Ok(CpuModel::O3),
            _ => Err(SimError::Configuration(format!("unknown cpu type '{}'", s))),
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CpuModel::Kvm => "kvm",
            CpuModel::Atomic => "atomic",
            CpuModel::Timing => "timing",
            CpuModel::Minor => "minor",
            CpuModel::O3 => "o3",
        };
        f.write_str(name)
    }
}

/// One configuration of a processing element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreVariant {
    /// Unique name among the variants of an element.
    pub name: String,
    /// Execution model.
    pub model: CpuModel,

    #[serde(default = "default_issue_width")]
    pub issue_width: usize,

    #[serde(default = "default_rob_entries")]
    pub rob_entries: usize,

    #[serde(default = "default_phys_regs")]
    pub phys_int_regs: usize,

    #[serde(default = "default_phys_regs")]
    pub phys_float_regs: usize,
}

fn default_issue_width() -> usize {
    1
}

fn default_rob_entries() -> usize {
    192
}

fn default_phys_regs() -> usize {
    256
}

impl CoreVariant {
    /// A variant of `model` with default structural sizes, named after the model.
    pub fn simple(model: CpuModel) -> Self {
        Self {
            name: model.to_string(),
            model,
            issue_width: default_issue_width(),
            rob_entries: default_rob_entries(),
            phys_int_regs: default_phys_regs(),
            phys_float_regs: default_phys_regs(),
        }
    }

    /// Wide out-of-order core: 8-wide, 256-entry ROB, 512 physical registers.
    pub fn big() -> Self {
        Self {
            name: "big".to_string(),
            model: CpuModel::O3,
            issue_width: 8,
            rob_entries: 256,
            phys_int_regs: 512,
            phys_float_regs: 512,
        }
    }

    /// Narrow out-of-order core: 2-wide, 30-entry ROB, 40 physical registers.
    pub fn little() -> Self {
        Self {
            name: "little".to_string(),
            model: CpuModel::O3,
            issue_width: 2,
            rob_entries: 30,
            phys_int_regs: 40,
            phys_float_regs: 40,
        }
    }

    /// Rejects structural sizes no core could run with.
    pub fn validate(&self) -> SimResult<()> {
        if self.issue_width == 0 {
            return Err(SimError::Configuration(format!(
                "core '{}' has zero issue width",
                self.name
            )));
        }
        if self.model == CpuModel::O3 && self.rob_entries == 0 {
            return Err(SimError::Configuration(format!(
                "core '{}' has an empty reorder buffer",
                self.name
            )));
        }
        Ok(())
    }

    /// Instructions that can be in flight, bounded by the ROB and free rename registers.
    pub fn window(&self) -> usize {
        self.rob_entries
            .min(self.phys_int_regs.saturating_sub(ARCH_INT_REGS))
            .max(1)
    }

    /// Sustained instructions per cycle when not stalled on memory.
    pub fn sustained_ipc(&self) -> f64 {
        match self.model {
            CpuModel::Kvm => KVM_IPC,
            CpuModel::Atomic | CpuModel::Timing => 1.0,
            CpuModel::Minor => (self.issue_width.min(2) as f64) * 0.75,
            CpuModel::O3 => {
                let w = self.window() as f64;
                self.issue_width as f64 * w / (w + WINDOW_KNEE)
            }
        }
    }

    /// Core cycles needed to retire `instructions` without memory stalls.
    pub fn cycles_for(&self, instructions: u64) -> u64 {
        (instructions as f64 / self.sustained_ipc()).ceil() as u64
    }

    /// Cycles of a memory access of `latency_cycles` the core cannot hide.
    pub fn exposed_stall(&self, latency_cycles: u64) -> u64 {
        match self.model {
            CpuModel::Kvm | CpuModel::Atomic => 0,
            CpuModel::Timing | CpuModel::Minor => latency_cycles,
            CpuModel::O3 => {
                let hidden = self.rob_entries as f64 / (self.rob_entries as f64 + 32.0);
                (latency_cycles as f64 * (1.0 - hidden)).ceil() as u64
            }
        }
    }
}
