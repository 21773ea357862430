//! Simulation Phase Orchestration CLI.
//!
//! The main executable. It parses the command line, installs logging, builds
//! one of the reference scenarios and prints its metrics.
//!
//! # Usage
//!
//! The binary offers three scenarios:
//! 1. **traffic**: Drives a memory backend with a synthetic request stream and
//!    reports bandwidth and average read latency.
//! 2. **switch**: Boots a workload on a fast-forward core, switches to the
//!    measurement core at the region of interest and dumps its statistics.
//! 3. **cores**: Runs a matrix multiply on one fixed core variant and reports
//!    simulated time and instruction count.

use clap::{Parser, Subcommand, ValueEnum};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

extern crate simphase;

use simphase::common::units::{parse_size, period_ticks};
use simphase::common::{SimError, SimResult};
use simphase::config::{Config, TrafficConfig};
use simphase::core::{CoreSwitchController, CoreVariant, CpuModel};
use simphase::sim::{
    handler_fn, Board, Decision, ExitCategory, ExitEventDispatcher, PhaseController, PhasePlan,
    TerminalHandler, TrafficGeneratorHarness, Workload,
};
use simphase::soc::memory::MemoryBackend;
use simphase::soc::traffic::TrafficPattern;
use simphase::stats::{self, StatsSnapshot};

/// Command-line arguments for the simulation driver.
#[derive(Parser, Debug)]
#[command(author, version, about = "Simulation phase orchestration")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure a memory backend with a traffic generator.
    Traffic {
        /// Bandwidth target such as "32GiB/s", or "unbounded".
        rate: String,

        /// Percentage of requests that are reads.
        read_fraction: u32,

        /// Memory backend: simple, DDR4 or SC_LPDDR5.
        memory: String,

        /// Requests target addresses below this limit, e.g. "1GiB" or "1048576".
        max_addr: String,

        #[arg(long, value_enum, default_value = "random")]
        pattern: PatternArg,

        #[arg(long, default_value = "1ms")]
        duration: String,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Print the report and raw statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fast-forward, switch cores at the region of interest and measure it.
    Switch {
        #[arg(short, long)]
        config: Option<String>,

        #[arg(long, default_value_t = 1_000_000)]
        boot_insts: u64,

        #[arg(long, default_value_t = 2_000_000)]
        roi_insts: u64,

        /// Simulated ticks allowed after the switch.
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Run a matrix multiply on one core variant.
    Cores {
        #[arg(value_enum)]
        cpu_type: CoreArg,

        /// Matrix dimension.
        #[arg(long, default_value_t = 32)]
        size: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PatternArg {
    Linear,
    Random,
}

impl From<PatternArg> for TrafficPattern {
    fn from(p: PatternArg) -> Self {
        match p {
            PatternArg::Linear => TrafficPattern::Linear,
            PatternArg::Random => TrafficPattern::Random,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CoreArg {
    Big,
    Little,
    Simple,
}

impl From<CoreArg> for CoreVariant {
    fn from(c: CoreArg) -> Self {
        match c {
            CoreArg::Big => CoreVariant::big(),
            CoreArg::Little => CoreVariant::little(),
            CoreArg::Simple => CoreVariant::simple(CpuModel::Timing),
        }
    }
}

/// Main entry point.
///
/// Errors are reported on stderr and mapped to a non-zero exit code; no
/// metric line is printed for a run that failed.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args.command) {
        eprintln!("[!] FATAL: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(command: Command) -> SimResult<()> {
    match command {
        Command::Traffic {
            rate,
            read_fraction,
            memory,
            max_addr,
            pattern,
            duration,
            seed,
            json,
        } => run_traffic(
            TrafficConfig {
                pattern: pattern.into(),
                duration,
                seed,
                ..TrafficConfig::from_args(&rate, read_fraction, &memory, parse_size(&max_addr)?)?
            },
            json,
        ),
        Command::Switch {
            config,
            boot_insts,
            roi_insts,
            max_ticks,
        } => {
            let config = match config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            run_switch(&config, boot_insts, roi_insts, max_ticks)
        }
        Command::Cores { cpu_type, size } => run_cores(cpu_type.into(), size),
    }
}

fn run_traffic(config: TrafficConfig, json: bool) -> SimResult<()> {
    let harness = TrafficGeneratorHarness::new(config)?;
    let report = harness.run()?;
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => return Err(SimError::Configuration(format!("cannot encode report: {}", e))),
        }
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn run_switch(config: &Config, boot_insts: u64, roi_insts: u64, max_ticks: Option<u64>) -> SimResult<()> {
    let board = Board::from_config(config, Workload::boot_then_roi(boot_insts, roi_insts))?;
    let mut plan = PhasePlan::default().pass_through(ExitCategory::Boot);
    if let Some(ticks) = max_ticks {
        plan = plan.max_ticks(ticks);
    }
    let controller = PhaseController::new(plan)?;
    let mut dispatcher = ExitEventDispatcher::new(board);
    controller.install(&mut dispatcher);

    let summary = dispatcher.run()?;
    let log = controller.record().log();
    info!(exits = summary.exits, final_tick = summary.final_tick, "switch run finished");

    println!("Workload:        {}", dispatcher.engine().workload_name());
    println!("Memory:          {}", dispatcher.engine().backend());
    if let Some(tick) = log.switched_at {
        println!("Switched at:     tick {}", tick);
    }
    if let Some(event) = &log.terminal {
        println!("Ended by:        {}", event);
    }
    match log.regions.last() {
        Some(region) => print!("{}", region.dump()),
        None => print!("{}", dispatcher.stats().snapshot_all()?.dump()),
    }
    Ok(())
}

fn run_cores(variant: CoreVariant, size: u64) -> SimResult<()> {
    let clock_hz = 3_000_000_000;
    debug!(variant = %variant.name, period = period_ticks(clock_hz), "building core board");
    let processor = CoreSwitchController::uniform(1, &[variant], 0x8000_0000)?;
    let board = Board::new(processor, MemoryBackend::Ddr4, clock_hz, Workload::matrix_multiply(size));

    let mut dispatcher = ExitEventDispatcher::new(board);
    dispatcher
        .register(
            ExitCategory::WorkRegionBegin,
            handler_fn("reset-stats", |_event, sim| {
                sim.stats().reset();
                Ok(Decision::Continue)
            }),
        )
        .register(
            ExitCategory::WorkRegionEnd,
            handler_fn("dump-stats", |_event, sim| {
                debug!("{}", sim.stats().snapshot_all()?.dump());
                Ok(Decision::Continue)
            }),
        )
        .register(ExitCategory::Terminal, TerminalHandler::new())
        .set_fallback(TerminalHandler::new());
    dispatcher.run()?;

    let snapshot: StatsSnapshot = dispatcher.stats().snapshot(&[stats::SIM_TICKS, stats::SIM_INSTS])?;
    println!("Total time: {:.3}ms", snapshot.elapsed_seconds()? * 1e3);
    println!("Total instructions: {}", snapshot.get(stats::SIM_INSTS)? as u64);
    Ok(())
}
