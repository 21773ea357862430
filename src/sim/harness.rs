//! Traffic Generator Harness.
//!
//! A self-contained memory characterisation run: a synthetic request stream
//! drives the chosen memory backend for a fixed duration, then one snapshot
//! of the statistics yields the achieved bandwidth and average read latency.
//! The only handler is the terminal one, so the run goes to natural
//! completion.

use super::dispatcher::{ExitEventDispatcher, RunSummary};
use super::event::ExitCategory;
use super::phase::TerminalHandler;
use super::traffic_board::TrafficBoard;
use crate::common::units::{period_ticks, GIB};
use crate::common::{SimResult, Tick};
use crate::config::TrafficConfig;
use crate::soc::memory::BLOCK_BYTES;
use crate::soc::traffic::TrafficGenerator;
use crate::stats::StatsSnapshot;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Metrics derived from one traffic run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrafficReport {
    /// Read plus written bytes per simulated second.
    pub bandwidth_bytes_per_sec: f64,
    /// Mean read latency in seconds.
    pub average_read_latency_sec: f64,
    /// Tick at which the generator finished.
    pub final_tick: Tick,
    /// Every counter at completion.
    pub snapshot: StatsSnapshot,
}

impl TrafficReport {
    /// Bandwidth in GiB/s.
    pub fn bandwidth_gib_per_sec(&self) -> f64 {
        self.bandwidth_bytes_per_sec / GIB
    }

    /// Mean read latency in nanoseconds.
    pub fn average_read_latency_ns(&self) -> f64 {
        self.average_read_latency_sec * 1e9
    }
}

impl fmt::Display for TrafficReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total bandwidth: {:.2} GiB/s", self.bandwidth_gib_per_sec())?;
        write!(f, "Average latency: {:.2} ns", self.average_read_latency_ns())
    }
}

/// Runs a traffic generator against a memory backend and reports its metrics.
pub struct TrafficGeneratorHarness {
    config: TrafficConfig,
    duration: Tick,
    issue_interval: Tick,
}

impl TrafficGeneratorHarness {
    /// Validates every option before any simulated time is spent.
    ///
    /// # Errors
    ///
    /// `Configuration` for a read percentage above 100, an address range
    /// smaller than one request, a zero duration or a malformed clock.
    pub fn new(config: TrafficConfig) -> SimResult<Self> {
        config.validate()?;
        let duration = config.duration_ticks()?;
        let issue_interval = match config.rate.ticks_for(BLOCK_BYTES) {
            Some(ticks) => ticks,
            None => period_ticks(config.clock_hz()?),
        };
        Ok(Self {
            config,
            duration,
            issue_interval,
        })
    }

    /// Validated options of this harness.
    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Ticks between consecutive requests.
    pub fn issue_interval(&self) -> Tick {
        self.issue_interval
    }

    fn build_board(&self) -> SimResult<TrafficBoard> {
        let generator = TrafficGenerator::new(
            self.config.pattern,
            self.config.address_limit,
            self.config.read_fraction,
            self.config.seed,
        )?;
        Ok(TrafficBoard::new(
            generator,
            self.config.memory_backend.build(),
            self.issue_interval,
            self.config.max_outstanding,
            self.duration,
        ))
    }

    /// Runs to completion and derives the metrics.
    ///
    /// # Errors
    ///
    /// `DivideByZero` when the run measured no time or issued no reads; in
    /// that case no metric is produced at all.
    pub fn run(&self) -> SimResult<TrafficReport> {
        let mut dispatcher = ExitEventDispatcher::new(self.build_board()?);
        dispatcher
            .register(ExitCategory::Terminal, TerminalHandler::new())
            .set_fallback(TerminalHandler::new());
        let summary: RunSummary = dispatcher.run()?;
        info!(
            pattern = %self.config.pattern,
            backend = %self.config.memory_backend,
            final_tick = summary.final_tick,
            "traffic run finished"
        );

        let snapshot = dispatcher.stats().snapshot_all()?;
        let bandwidth = snapshot.bandwidth()?;
        let latency = snapshot.average_read_latency()?;
        Ok(TrafficReport {
            bandwidth_bytes_per_sec: bandwidth,
            average_read_latency_sec: latency,
            final_tick: summary.final_tick,
            snapshot,
        })
    }
}
