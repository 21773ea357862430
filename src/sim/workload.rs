//! Synthetic Workloads.
//!
//! A workload is the script a [`Board`](super::board::Board) executes: blocks
//! of instructions with a given number of memory operations, interleaved with
//! the exits a real program would trigger (boot complete, work begin/end).
//! Fault steps let tests exercise the engine-fault path.

use super::event::ExitCategory;

/// One step of a workload script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadStep {
    /// Retire `instructions` on every element, `loads` and `stores` of them touching memory.
    Execute {
        instructions: u64,
        loads: u64,
        stores: u64,
    },
    /// Pause with the given category.
    Exit { category: ExitCategory, cause: String },
    /// Fail with an engine fault.
    Fault(String),
}

/// An ordered script of workload steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Workload {
    name: String,
    steps: Vec<WorkloadStep>,
}

impl Workload {
    /// An empty workload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[WorkloadStep] {
        &self.steps
    }

    /// Appends an execute step; memory operation counts are capped by `instructions`.
    pub fn execute(mut self, instructions: u64, loads: u64, stores: u64) -> Self {
        self.steps.push(WorkloadStep::Execute {
            instructions,
            loads: loads.min(instructions),
            stores: stores.min(instructions.saturating_sub(loads)),
        });
        self
    }

    /// Appends a pause.
    pub fn exit(mut self, category: ExitCategory, cause: impl Into<String>) -> Self {
        self.steps.push(WorkloadStep::Exit {
            category,
            cause: cause.into(),
        });
        self
    }

    /// Appends an engine fault.
    pub fn fault(mut self, message: impl Into<String>) -> Self {
        self.steps.push(WorkloadStep::Fault(message.into()));
        self
    }

    /// Boots, marks a region of interest around `roi_insts`, then runs a short tail.
    ///
    /// Roughly a fifth of instructions load and a tenth store.
    pub fn boot_then_roi(boot_insts: u64, roi_insts: u64) -> Self {
        Workload::new("boot-then-roi")
            .execute(boot_insts, boot_insts / 5, boot_insts / 10)
            .exit(ExitCategory::Boot, "kernel booted")
            .exit(ExitCategory::WorkRegionBegin, "workbegin")
            .execute(roi_insts, roi_insts / 5, roi_insts / 10)
            .exit(ExitCategory::WorkRegionEnd, "workend")
            .execute(roi_insts / 10, roi_insts / 50, roi_insts / 100)
    }

    /// An `n`x`n` matrix multiply: two loads per multiply-add and one store per output.
    pub fn matrix_multiply(n: u64) -> Self {
        let outputs = n.saturating_mul(n);
        let inner = outputs.saturating_mul(n);
        Workload::new("matrix-multiply")
            .exit(ExitCategory::WorkRegionBegin, "workbegin")
            .execute(inner.saturating_mul(4), inner.saturating_mul(2), outputs)
            .exit(ExitCategory::WorkRegionEnd, "workend")
    }
}
