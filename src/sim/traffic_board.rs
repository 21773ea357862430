//! Reference Engine: Traffic Generator Board.
//!
//! A test board with no processor: a synthetic request generator drives the
//! memory backend directly for a fixed simulated duration. Requests issue
//! one interval apart (the rate target, or one per clock when unbounded),
//! but never with more than `max_outstanding` responses pending. When the
//! duration is reached the board pauses once with `Terminal` and then
//! reports completion.

use super::engine::SimulationEngine;
use super::event::{ExitCategory, ExitEvent, RunOutcome};
use crate::common::{SimResult, Tick};
use crate::soc::memory::{MemoryController, BLOCK_BYTES};
use crate::soc::traffic::TrafficGenerator;
use crate::stats::{self, SimStats};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Generating,
    TerminalSent,
    Done,
}

/// Traffic generator wired straight to a memory backend.
pub struct TrafficBoard {
    generator: TrafficGenerator,
    memory: Box<dyn MemoryController>,
    issue_interval: Tick,
    max_outstanding: usize,
    duration_end: Tick,
    tick: Tick,
    next_issue: Tick,
    outstanding: BinaryHeap<Reverse<Tick>>,
    tick_bound: Option<Tick>,
    stats: SimStats,
    progress: Progress,
}

impl TrafficBoard {
    /// Creates a board that generates traffic for `duration` ticks.
    ///
    /// # Arguments
    ///
    /// * `issue_interval` - Ticks between consecutive requests (at least one).
    /// * `max_outstanding` - Cap on requests awaiting a response (at least one).
    pub fn new(
        generator: TrafficGenerator,
        memory: Box<dyn MemoryController>,
        issue_interval: Tick,
        max_outstanding: usize,
        duration: Tick,
    ) -> Self {
        Self {
            generator,
            memory,
            issue_interval: issue_interval.max(1),
            max_outstanding: max_outstanding.max(1),
            duration_end: duration,
            tick: 0,
            next_issue: 0,
            outstanding: BinaryHeap::new(),
            tick_bound: None,
            stats: SimStats::new(0),
            progress: Progress::Generating,
        }
    }

    /// Requests issued but not yet answered at the current tick.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

impl SimulationEngine for TrafficBoard {
    fn run_until_pause(&mut self) -> SimResult<RunOutcome> {
        match self.progress {
            Progress::Generating => {}
            Progress::TerminalSent | Progress::Done => {
                self.progress = Progress::Done;
                return Ok(RunOutcome::Completed);
            }
        }

        let stop_at = match self.tick_bound {
            Some(bound) => bound.min(self.duration_end),
            None => self.duration_end,
        };

        while self.next_issue < stop_at {
            while let Some(&Reverse(ready)) = self.outstanding.peek() {
                if ready > self.next_issue {
                    break;
                }
                self.outstanding.pop();
            }
            if self.outstanding.len() >= self.max_outstanding {
                if let Some(Reverse(ready)) = self.outstanding.pop() {
                    self.next_issue = self.next_issue.max(ready);
                }
                continue;
            }

            let (addr, kind) = self.generator.next_request();
            let ready = self.memory.access(addr, kind, self.next_issue);
            self.stats
                .record_access(kind, BLOCK_BYTES, ready.saturating_sub(self.next_issue));
            self.outstanding.push(Reverse(ready));
            self.next_issue += self.issue_interval;
        }

        self.tick = self.tick.max(stop_at);
        while let Some(&Reverse(ready)) = self.outstanding.peek() {
            if ready > self.tick {
                break;
            }
            self.outstanding.pop();
        }
        debug!(
            tick = self.tick,
            reads = self.stats.total_reads,
            writes = self.stats.total_writes,
            "traffic generation paused"
        );

        if stop_at < self.duration_end {
            self.tick_bound = None;
            return Ok(RunOutcome::Paused(ExitEvent::new(
                ExitCategory::MaxTick,
                "simulate() limit reached",
                self.tick,
            )));
        }
        self.progress = Progress::TerminalSent;
        Ok(RunOutcome::Paused(ExitEvent::new(
            ExitCategory::Terminal,
            format!("{} generator completed", self.generator.pattern()),
            self.tick,
        )))
    }

    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn read_counter(&self, name: &str) -> Option<f64> {
        self.stats.counter(name, self.tick, self.tick_frequency())
    }

    fn counter_names(&self) -> Vec<String> {
        stats::COUNTERS.iter().map(|s| s.to_string()).collect()
    }

    fn reset_counters(&mut self) {
        self.stats.reset(self.tick);
    }

    fn set_tick_bound(&mut self, tick: Tick) {
        self.tick_bound = Some(tick);
    }
}
