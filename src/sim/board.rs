//! Reference Engine: Processor Board.
//!
//! A `Board` wires a switchable processor to a memory backend and executes
//! a synthetic [`Workload`] on it. It implements [`SimulationEngine`], so the
//! dispatcher can drive it exactly as it would drive any other engine.
//!
//! Execution proceeds in slices of at most [`SLICE_INSTS`] instructions. Each
//! element retires the slice at the pace of its active variant: the variant
//! decides the base cycle count and how much of each memory access latency
//! stalls it. The board's clock advances by the slowest element. The tick
//! bound is checked between slices and time is clamped to it.
//!
//! Functional variants (kvm, atomic) access memory atomically: they are
//! charged the idle latency of the backend and never occupy its data path,
//! so fast-forwarding leaves no queued requests behind for the next phase.

use super::engine::SimulationEngine;
use super::event::{ExitCategory, ExitEvent, RunOutcome};
use super::workload::{Workload, WorkloadStep};
use crate::common::units::{parse_frequency, period_ticks};
use crate::common::{AccessType, SimError, SimResult, Tick};
use crate::config::Config;
use crate::core::arch::MemRef;
use crate::core::CoreSwitchController;
use crate::soc::memory::{MemoryBackend, MemoryController, BLOCK_BYTES};
use crate::stats::{self, SimStats};
use std::collections::VecDeque;
use tracing::{debug, error};

/// Largest instruction block executed between tick-bound checks.
pub const SLICE_INSTS: u64 = 10_000;

/// Address space reserved for each element's data.
const ELEMENT_REGION: u64 = 256 << 20;

/// Register that mirrors the retired instruction count, for state checks.
const RETIRED_REG: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Running,
    TerminalSent,
    Done,
}

/// A processor board executing a scripted workload.
pub struct Board {
    clock_period: Tick,
    processor: CoreSwitchController,
    memory: Box<dyn MemoryController>,
    backend: MemoryBackend,
    workload_name: String,
    steps: VecDeque<WorkloadStep>,
    next_addr: Vec<u64>,
    tick: Tick,
    tick_bound: Option<Tick>,
    stats: SimStats,
    switches_at_reset: u64,
    progress: Progress,
    faulted: Option<String>,
}

impl Board {
    /// Assembles a board.
    ///
    /// # Arguments
    ///
    /// * `processor` - The switchable processor; its elements start on their first variant.
    /// * `backend` - Memory system behind every element.
    /// * `clock_hz` - Core clock frequency.
    /// * `workload` - Script to execute.
    pub fn new(
        processor: CoreSwitchController,
        backend: MemoryBackend,
        clock_hz: u64,
        workload: Workload,
    ) -> Self {
        let elements = processor.elements().len();
        Self {
            clock_period: period_ticks(clock_hz),
            processor,
            memory: backend.build(),
            backend,
            workload_name: workload.name().to_string(),
            steps: workload.steps().iter().cloned().collect(),
            next_addr: (0..elements as u64).map(|i| i * ELEMENT_REGION).collect(),
            tick: 0,
            tick_bound: None,
            stats: SimStats::new(0),
            switches_at_reset: 0,
            progress: Progress::Running,
            faulted: None,
        }
    }

    /// Builds a board from the `[board]` and `[processor]` configuration tables.
    pub fn from_config(config: &Config, workload: Workload) -> SimResult<Self> {
        let clock_hz = parse_frequency(&config.board.clk_freq)?;
        let processor = CoreSwitchController::uniform(
            config.processor.num_cores,
            &config.processor.variants,
            config.board.start_pc,
        )?;
        Ok(Self::new(processor, config.board.memory, clock_hz, workload))
    }

    /// Memory backend behind the processor.
    pub fn backend(&self) -> MemoryBackend {
        self.backend
    }

    pub fn workload_name(&self) -> &str {
        &self.workload_name
    }

    /// Direct processor access. Switching through it is still pause-gated.
    pub fn processor_ref(&self) -> &CoreSwitchController {
        &self.processor
    }

    fn pause(&mut self, category: ExitCategory, cause: impl Into<String>) -> RunOutcome {
        self.processor.pause();
        RunOutcome::Paused(ExitEvent::new(category, cause, self.tick))
    }

    fn execute_slice(&mut self, instructions: u64, loads: u64, stores: u64) {
        let start = self.tick;
        let period = self.clock_period;
        let mem_ops = loads + stores;
        let mut longest: Tick = 0;

        for (slot, element) in self.processor.elements_mut().iter_mut().enumerate() {
            let variant = element.active_variant().clone();
            let functional = variant.model.is_functional();
            let base_cycles = variant.cycles_for(instructions);
            let mut stall_cycles = 0;

            for i in 0..mem_ops {
                let kind = if i < loads {
                    AccessType::Read
                } else {
                    AccessType::Write
                };
                let addr = self.next_addr[slot];
                let region_base = slot as u64 * ELEMENT_REGION;
                self.next_addr[slot] = region_base + (addr - region_base + BLOCK_BYTES) % ELEMENT_REGION;

                let issue = start + (base_cycles + stall_cycles) * i / mem_ops.max(1) * period;
                let ready_at = if functional {
                    issue + self.memory.idle_latency(addr, kind)
                } else {
                    self.memory.access(addr, kind, issue)
                };
                let latency = ready_at.saturating_sub(issue);
                self.stats.record_access(kind, BLOCK_BYTES, latency);
                stall_cycles += variant.exposed_stall(latency / period);
                element.arch_mut().issue(MemRef {
                    addr,
                    kind,
                    ready_at,
                });
            }

            let cycles = (base_cycles + stall_cycles).max(1);
            let arch = element.arch_mut();
            arch.retire(instructions);
            let retired = arch.retired;
            arch.regs.write(RETIRED_REG, retired);

            let window = variant.window();
            let pipeline = element.pipeline_mut();
            pipeline.retired += instructions;
            pipeline.active_cycles += cycles;
            pipeline.rob_occupancy = window.min(instructions as usize);

            self.stats.cycles += cycles;
            self.stats.instructions += instructions;
            self.stats.stalls_mem += stall_cycles;
            longest = longest.max(cycles * period);
        }

        self.tick = start + longest.max(period);
        if let Some(bound) = self.tick_bound {
            self.tick = self.tick.min(bound.max(start));
        }
        let now = self.tick;
        for element in self.processor.elements_mut() {
            element.arch_mut().complete_until(now);
        }
    }
}

/// `part * slice / total` without intermediate overflow.
fn proportion(part: u64, slice: u64, total: u64) -> u64 {
    (part as u128 * slice as u128 / total.max(1) as u128) as u64
}

impl SimulationEngine for Board {
    fn run_until_pause(&mut self) -> SimResult<RunOutcome> {
        if let Some(msg) = &self.faulted {
            return Err(SimError::EngineFault(format!("board already faulted: {}", msg)));
        }
        match self.progress {
            Progress::Running => {}
            Progress::TerminalSent | Progress::Done => {
                self.progress = Progress::Done;
                self.processor.halt();
                return Ok(RunOutcome::Completed);
            }
        }

        self.processor.begin_run();
        loop {
            if let Some(bound) = self.tick_bound {
                if self.tick >= bound {
                    self.tick_bound = None;
                    return Ok(self.pause(ExitCategory::MaxTick, "simulate() limit reached"));
                }
            }

            let Some(step) = self.steps.pop_front() else {
                self.progress = Progress::TerminalSent;
                return Ok(self.pause(
                    ExitCategory::Terminal,
                    "exiting with last active thread context",
                ));
            };

            match step {
                WorkloadStep::Exit { category, cause } => {
                    return Ok(self.pause(category, cause));
                }
                WorkloadStep::Fault(msg) => {
                    error!(tick = self.tick, %msg, "board fault");
                    self.processor.halt();
                    self.faulted = Some(msg.clone());
                    return Err(SimError::EngineFault(msg));
                }
                WorkloadStep::Execute {
                    instructions,
                    loads,
                    stores,
                } => {
                    if instructions == 0 {
                        continue;
                    }
                    let slice = instructions.min(SLICE_INSTS);
                    let slice_loads = proportion(loads, slice, instructions);
                    let slice_stores = proportion(stores, slice, instructions);
                    if slice < instructions {
                        self.steps.push_front(WorkloadStep::Execute {
                            instructions: instructions - slice,
                            loads: loads - slice_loads,
                            stores: stores - slice_stores,
                        });
                    }
                    self.execute_slice(slice, slice_loads, slice_stores);
                    debug!(tick = self.tick, slice, "executed slice");
                }
            }
        }
    }

    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn read_counter(&self, name: &str) -> Option<f64> {
        if name == stats::CORE_SWITCHES {
            return Some((self.processor.switch_count() - self.switches_at_reset) as f64);
        }
        self.stats.counter(name, self.tick, self.tick_frequency())
    }

    fn counter_names(&self) -> Vec<String> {
        stats::COUNTERS.iter().map(|s| s.to_string()).collect()
    }

    fn reset_counters(&mut self) {
        self.stats.reset(self.tick);
        self.switches_at_reset = self.processor.switch_count();
    }

    fn set_tick_bound(&mut self, tick: Tick) {
        self.tick_bound = Some(tick);
    }

    fn processor(&self) -> Option<&CoreSwitchController> {
        Some(&self.processor)
    }

    fn processor_mut(&mut self) -> Option<&mut CoreSwitchController> {
        Some(&mut self.processor)
    }
}
