//! Simulation statistics collection, sampling and derived metrics.
//!
//! Engines accumulate raw counters in a [`SimStats`]. The orchestration layer
//! never reads that struct directly: it goes through a [`StatsSampler`], which
//! reads named counters from the engine into an immutable [`StatsSnapshot`]
//! tagged with the tick of capture, and which can ask the engine to zero its
//! accumulators at a window boundary.
//!
//! Cumulative counters (`bytes_read`, `sim_insts`, `sim_ticks`, ...) restart
//! from zero on reset. Instantaneous counters (`final_tick`, `sim_freq`) are
//! never reset.

use crate::common::{AccessType, SimError, SimResult, Tick, GIB};
use crate::sim::engine::SimulationEngine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, info};

/// Ticks elapsed in the current statistics window.
pub const SIM_TICKS: &str = "sim_ticks";
/// Current simulated tick.
pub const FINAL_TICK: &str = "final_tick";
/// Ticks per simulated second.
pub const SIM_FREQ: &str = "sim_freq";
/// Instructions retired in the window.
pub const SIM_INSTS: &str = "sim_insts";
/// Core cycles spent in the window, summed over elements.
pub const NUM_CYCLES: &str = "num_cycles";
/// Bytes returned by read requests.
pub const BYTES_READ: &str = "bytes_read";
/// Bytes carried by write requests.
pub const BYTES_WRITTEN: &str = "bytes_written";
/// Completed read requests.
pub const TOTAL_READS: &str = "total_reads";
/// Completed write requests.
pub const TOTAL_WRITES: &str = "total_writes";
/// Sum of read latencies, in ticks.
pub const TOTAL_READ_LATENCY: &str = "total_read_latency";
/// Sum of write latencies, in ticks.
pub const TOTAL_WRITE_LATENCY: &str = "total_write_latency";
/// Core cycles stalled waiting on memory.
pub const STALLS_MEM: &str = "stalls_mem";
/// Core variant switches since the last reset.
pub const CORE_SWITCHES: &str = "core_switches";

/// Every counter a [`SimStats`] exposes, in report order.
pub const COUNTERS: &[&str] = &[
    SIM_TICKS,
    FINAL_TICK,
    SIM_FREQ,
    SIM_INSTS,
    NUM_CYCLES,
    BYTES_READ,
    BYTES_WRITTEN,
    TOTAL_READS,
    TOTAL_WRITES,
    TOTAL_READ_LATENCY,
    TOTAL_WRITE_LATENCY,
    STALLS_MEM,
    CORE_SWITCHES,
];

/// Counters that reflect the current instant and survive a reset.
pub const INSTANTANEOUS: &[&str] = &[FINAL_TICK, SIM_FREQ];

/// Returns `true` if `name` is unaffected by a statistics reset.
pub fn is_instantaneous(name: &str) -> bool {
    INSTANTANEOUS.contains(&name)
}

/// Accumulating counters kept by an engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    window_start: Tick,

    /// Core cycles, summed over elements.
    pub cycles: u64,
    /// Retired instructions.
    pub instructions: u64,

    pub bytes_read: u64,
    pub bytes_written: u64,
    pub total_reads: u64,
    pub total_writes: u64,
    pub total_read_latency: u64,
    pub total_write_latency: u64,

    /// Cycles lost to exposed memory latency.
    pub stalls_mem: u64,
    /// Variant switches recorded by the engine.
    pub core_switches: u64,
}

impl SimStats {
    /// Creates an empty window starting at `now`.
    pub fn new(now: Tick) -> Self {
        Self {
            window_start: now,
            ..Default::default()
        }
    }

    /// Zeroes every accumulator and starts a new window at `now`.
    pub fn reset(&mut self, now: Tick) {
        *self = Self::new(now);
    }

    /// Tick at which the current window opened.
    pub fn window_start(&self) -> Tick {
        self.window_start
    }

    /// Records one completed memory request.
    pub fn record_access(&mut self, kind: AccessType, bytes: u64, latency: Tick) {
        match kind {
            AccessType::Read => {
                self.bytes_read += bytes;
                self.total_reads += 1;
                self.total_read_latency += latency;
            }
            AccessType::Write => {
                self.bytes_written += bytes;
                self.total_writes += 1;
                self.total_write_latency += latency;
            }
        }
    }

    /// Reads one counter by name.
    ///
    /// # Arguments
    ///
    /// * `name` - One of [`COUNTERS`].
    /// * `now` - Current simulated tick.
    /// * `frequency` - Ticks per simulated second.
    pub fn counter(&self, name: &str, now: Tick, frequency: u64) -> Option<f64> {
        let value = match name {
            SIM_TICKS => now.saturating_sub(self.window_start),
            FINAL_TICK => now,
            SIM_FREQ => frequency,
            SIM_INSTS => self.instructions,
            NUM_CYCLES => self.cycles,
            BYTES_READ => self.bytes_read,
            BYTES_WRITTEN => self.bytes_written,
            TOTAL_READS => self.total_reads,
            TOTAL_WRITES => self.total_writes,
            TOTAL_READ_LATENCY => self.total_read_latency,
            TOTAL_WRITE_LATENCY => self.total_write_latency,
            STALLS_MEM => self.stalls_mem,
            CORE_SWITCHES => self.core_switches,
            _ => return None,
        };
        Some(value as f64)
    }
}

/// Converts an elapsed tick count into seconds.
///
/// # Errors
///
/// `DivideByZero` if `frequency` is zero.
pub fn elapsed_seconds(ticks: Tick, frequency: u64) -> SimResult<f64> {
    if frequency == 0 {
        return Err(SimError::DivideByZero("elapsed seconds (zero tick frequency)".to_string()));
    }
    Ok(ticks as f64 / frequency as f64)
}

/// Bytes per second moved in `seconds`.
///
/// # Errors
///
/// `DivideByZero` if no simulated time elapsed.
pub fn bandwidth(bytes: f64, seconds: f64) -> SimResult<f64> {
    if seconds == 0.0 {
        return Err(SimError::DivideByZero("bandwidth (zero elapsed time)".to_string()));
    }
    Ok(bytes / seconds)
}

/// Mean latency of `count` requests that accumulated `total_latency`.
///
/// # Errors
///
/// `DivideByZero` if `count` is zero; no value is produced in that case.
pub fn average_latency(total_latency: f64, count: f64) -> SimResult<f64> {
    if count == 0.0 {
        return Err(SimError::DivideByZero("average latency (zero requests)".to_string()));
    }
    Ok(total_latency / count)
}

/// Immutable point-in-time capture of engine counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsSnapshot {
    tick: Tick,
    frequency: u64,
    values: BTreeMap<String, f64>,
}

impl StatsSnapshot {
    /// Assembles a snapshot from already-read values.
    pub fn new(tick: Tick, frequency: u64, values: BTreeMap<String, f64>) -> Self {
        Self {
            tick,
            frequency,
            values,
        }
    }

    /// Tick at which the snapshot was captured.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Ticks per simulated second at capture.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// Every captured counter, by name.
    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Returns a captured counter.
    ///
    /// # Errors
    ///
    /// `NotFound` if the counter was not part of this snapshot.
    pub fn get(&self, name: &str) -> SimResult<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| SimError::NotFound(format!("counter '{}' in snapshot", name)))
    }

    /// Cumulative counters accumulated between `earlier` and `self`.
    ///
    /// Instantaneous counters keep the later value. Only meaningful if no
    /// reset happened between the two captures.
    ///
    /// # Errors
    ///
    /// `PreconditionViolation` if `earlier` was captured after `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> SimResult<StatsSnapshot> {
        if earlier.tick > self.tick {
            return Err(SimError::PreconditionViolation(format!(
                "snapshot at tick {} is not earlier than tick {}",
                earlier.tick, self.tick
            )));
        }
        let values = self
            .values
            .iter()
            .map(|(name, &v)| {
                let delta = match earlier.values.get(name) {
                    Some(&before) if !is_instantaneous(name) => v - before,
                    _ => v,
                };
                (name.clone(), delta)
            })
            .collect();
        Ok(StatsSnapshot::new(self.tick, self.frequency, values))
    }

    /// Seconds covered by the statistics window (`sim_ticks`).
    pub fn elapsed_seconds(&self) -> SimResult<f64> {
        elapsed_seconds(self.get(SIM_TICKS)? as Tick, self.frequency)
    }

    /// Read plus written bytes per simulated second over the window.
    pub fn bandwidth(&self) -> SimResult<f64> {
        let bytes = self.get(BYTES_READ)? + self.get(BYTES_WRITTEN)?;
        bandwidth(bytes, self.elapsed_seconds()?)
    }

    /// Mean read latency in seconds.
    pub fn average_read_latency(&self) -> SimResult<f64> {
        let ticks = average_latency(self.get(TOTAL_READ_LATENCY)?, self.get(TOTAL_READS)?)?;
        if self.frequency == 0 {
            return Err(SimError::DivideByZero("latency seconds (zero tick frequency)".to_string()));
        }
        Ok(ticks / self.frequency as f64)
    }

    /// Renders the snapshot as a human-readable report.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "SIMULATION STATISTICS @ tick {}", self.tick);
        let _ = writeln!(out, "==========================================================");
        for (name, value) in &self.values {
            let _ = writeln!(out, "{:<24} {}", name, value);
        }
        if let (Ok(insts), Ok(cycles)) = (self.get(SIM_INSTS), self.get(NUM_CYCLES)) {
            if cycles > 0.0 {
                let _ = writeln!(out, "{:<24} {:.4}", "sim_ipc", insts / cycles);
            }
        }
        if let Ok(bw) = self.bandwidth() {
            let _ = writeln!(out, "{:<24} {:.2} GiB/s", "bandwidth", bw / GIB);
        }
        let _ = writeln!(out, "==========================================================");
        out
    }
}

/// Reads counters from an engine and resets its accumulators.
pub struct StatsSampler<'a> {
    engine: &'a mut dyn SimulationEngine,
}

impl<'a> StatsSampler<'a> {
    /// Borrows a paused engine.
    pub fn new(engine: &'a mut dyn SimulationEngine) -> Self {
        Self { engine }
    }

    /// Captures the named counters at the current tick. Pure read.
    ///
    /// # Errors
    ///
    /// `NotFound` if the engine does not expose one of the counters.
    pub fn snapshot(&self, counter_names: &[&str]) -> SimResult<StatsSnapshot> {
        let mut values = BTreeMap::new();
        for &name in counter_names {
            let value = self
                .engine
                .read_counter(name)
                .ok_or_else(|| SimError::NotFound(format!("counter '{}'", name)))?;
            values.insert(name.to_string(), value);
        }
        let tick = self.engine.current_tick();
        debug!(tick, counters = values.len(), "captured stats snapshot");
        Ok(StatsSnapshot::new(tick, self.engine.tick_frequency(), values))
    }

    /// Captures every counter the engine exposes.
    pub fn snapshot_all(&self) -> SimResult<StatsSnapshot> {
        let names = self.engine.counter_names();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.snapshot(&names)
    }

    /// Zeroes the engine's cumulative counters.
    ///
    /// Call only between measurement windows; snapshots taken earlier in the
    /// current window no longer describe the same window afterwards.
    pub fn reset(&mut self) {
        let tick = self.engine.current_tick();
        self.engine.reset_counters();
        info!(tick, "statistics reset");
    }
}
