//! Integration tests for statistics sampling and derived metrics.

use simphase::common::{AccessType, SimError, TICKS_PER_SECOND};
use simphase::core::{CoreSwitchController, CoreVariant, CpuModel};
use simphase::sim::{
    handler_fn, Board, Decision, ExitCategory, ExitEventDispatcher, TerminalHandler, Workload,
};
use simphase::soc::memory::MemoryBackend;
use simphase::stats::{self, SimStats, StatsSnapshot};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

fn timing_board(workload: Workload) -> Board {
    let processor =
        CoreSwitchController::uniform(1, &[CoreVariant::simple(CpuModel::Timing)], 0x8000_0000)
            .unwrap();
    Board::new(processor, MemoryBackend::Simple, 3_000_000_000, workload)
}

fn snapshot_of(tick: u64, values: &[(&str, f64)]) -> StatsSnapshot {
    let values: BTreeMap<String, f64> = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    StatsSnapshot::new(tick, TICKS_PER_SECOND, values)
}

/// Tests that a reset followed by a snapshot reads zero cumulative counters.
#[test]
fn test_reset_then_snapshot_zeroes_cumulative_counters() {
    let workload = Workload::new("reset")
        .execute(50_000, 10_000, 5_000)
        .exit(ExitCategory::Generic, "checkpoint");
    let captured: Rc<RefCell<Vec<StatsSnapshot>>> = Rc::default();
    let sink = captured.clone();

    let mut dispatcher = ExitEventDispatcher::new(timing_board(workload));
    dispatcher.register(
        ExitCategory::Generic,
        handler_fn("reset-and-snapshot", move |_event, sim| {
            sim.stats().reset();
            sink.borrow_mut().push(sim.stats().snapshot_all()?);
            Ok(Decision::Stop)
        }),
    );
    let summary = dispatcher.run().unwrap();

    let snapshots = captured.borrow();
    let snapshot = &snapshots[0];
    assert!(summary.final_tick > 0);
    assert_eq!(snapshot.tick(), summary.final_tick);
    assert_eq!(snapshot.get(stats::BYTES_READ).unwrap(), 0.0);
    assert_eq!(snapshot.get(stats::BYTES_WRITTEN).unwrap(), 0.0);
    assert_eq!(snapshot.get(stats::SIM_INSTS).unwrap(), 0.0);
    assert_eq!(snapshot.get(stats::SIM_TICKS).unwrap(), 0.0);
    assert_eq!(snapshot.get(stats::FINAL_TICK).unwrap(), summary.final_tick as f64);
    assert_eq!(snapshot.get(stats::SIM_FREQ).unwrap(), TICKS_PER_SECOND as f64);
}

/// Tests that snapshots taken without a reset accumulate.
#[test]
fn test_snapshot_is_pure_read() {
    let workload = Workload::new("pure")
        .execute(20_000, 4_000, 0)
        .exit(ExitCategory::Generic, "first")
        .exit(ExitCategory::Generic, "second");
    let captured: Rc<RefCell<Vec<StatsSnapshot>>> = Rc::default();
    let sink = captured.clone();

    let mut dispatcher = ExitEventDispatcher::new(timing_board(workload));
    dispatcher
        .register(
            ExitCategory::Generic,
            handler_fn("snapshot", move |_event, sim| {
                sink.borrow_mut()
                    .push(sim.stats().snapshot(&[stats::BYTES_READ, stats::SIM_INSTS])?);
                Ok(Decision::Continue)
            }),
        )
        .register(ExitCategory::Terminal, TerminalHandler::new());
    dispatcher.run().unwrap();

    let snapshots = captured.borrow();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0].get(stats::BYTES_READ).unwrap(), 4_000.0 * 64.0);
    assert_eq!(snapshots[0].get(stats::SIM_INSTS).unwrap(), 20_000.0);
    assert!(matches!(snapshots[0].get(stats::STALLS_MEM), Err(SimError::NotFound(_))));
}

/// Tests that asking for an unknown counter fails the snapshot.
#[test]
fn test_unknown_counter_not_found() {
    let workload = Workload::new("unknown").exit(ExitCategory::Generic, "now");
    let mut dispatcher = ExitEventDispatcher::new(timing_board(workload));
    dispatcher.register(
        ExitCategory::Generic,
        handler_fn("bad-counter", |_event, sim| {
            sim.stats().snapshot(&[stats::BYTES_READ, "l3_misses"])?;
            Ok(Decision::Stop)
        }),
    );

    assert!(matches!(dispatcher.run(), Err(SimError::NotFound(_))));
}

/// Tests that average latency with no requests is a divide-by-zero error.
#[test]
fn test_average_latency_zero_count() {
    assert!(matches!(
        stats::average_latency(1_000.0, 0.0),
        Err(SimError::DivideByZero(_))
    ));
    assert_eq!(stats::average_latency(1_000.0, 4.0).unwrap(), 250.0);
}

/// Tests that bandwidth and elapsed time refuse zero denominators.
#[test]
fn test_zero_denominators() {
    assert!(matches!(stats::bandwidth(64.0, 0.0), Err(SimError::DivideByZero(_))));
    assert!(matches!(stats::elapsed_seconds(10, 0), Err(SimError::DivideByZero(_))));
    assert_eq!(stats::elapsed_seconds(TICKS_PER_SECOND / 2, TICKS_PER_SECOND).unwrap(), 0.5);
}

/// Tests the derived metrics of a snapshot.
#[test]
fn test_snapshot_metrics() {
    let gib = (1u64 << 30) as f64;
    let snapshot = snapshot_of(
        TICKS_PER_SECOND,
        &[
            (stats::SIM_TICKS, TICKS_PER_SECOND as f64),
            (stats::BYTES_READ, gib / 2.0),
            (stats::BYTES_WRITTEN, gib / 2.0),
            (stats::TOTAL_READS, 4.0),
            (stats::TOTAL_READ_LATENCY, 80_000.0),
        ],
    );

    assert_eq!(snapshot.elapsed_seconds().unwrap(), 1.0);
    assert_eq!(snapshot.bandwidth().unwrap(), gib);
    let latency = snapshot.average_read_latency().unwrap();
    assert!((latency - 20e-9).abs() < 1e-15);
}

/// Tests that a snapshot covering no reads produces no latency figure.
#[test]
fn test_snapshot_latency_without_reads() {
    let snapshot = snapshot_of(
        100,
        &[
            (stats::SIM_TICKS, 100.0),
            (stats::TOTAL_READS, 0.0),
            (stats::TOTAL_READ_LATENCY, 0.0),
        ],
    );
    assert!(matches!(
        snapshot.average_read_latency(),
        Err(SimError::DivideByZero(_))
    ));

    let empty_window = snapshot_of(100, &[(stats::SIM_TICKS, 0.0), (stats::BYTES_READ, 0.0), (stats::BYTES_WRITTEN, 0.0)]);
    assert!(matches!(empty_window.bandwidth(), Err(SimError::DivideByZero(_))));
}

/// Tests the difference of two snapshots.
#[test]
fn test_snapshot_since() {
    let earlier = snapshot_of(
        1_000,
        &[(stats::BYTES_READ, 640.0), (stats::FINAL_TICK, 1_000.0)],
    );
    let later = snapshot_of(
        3_000,
        &[(stats::BYTES_READ, 1_920.0), (stats::FINAL_TICK, 3_000.0)],
    );

    let delta = later.since(&earlier).unwrap();
    assert_eq!(delta.get(stats::BYTES_READ).unwrap(), 1_280.0);
    assert_eq!(delta.get(stats::FINAL_TICK).unwrap(), 3_000.0);
    assert!(matches!(
        earlier.since(&later),
        Err(SimError::PreconditionViolation(_))
    ));
}

/// Tests the raw accumulators an engine keeps.
#[test]
fn test_sim_stats_counters() {
    let mut sim_stats = SimStats::new(100);
    sim_stats.record_access(AccessType::Read, 64, 20);
    sim_stats.record_access(AccessType::Read, 64, 40);
    sim_stats.record_access(AccessType::Write, 64, 10);

    let freq = TICKS_PER_SECOND;
    assert_eq!(sim_stats.counter(stats::BYTES_READ, 500, freq), Some(128.0));
    assert_eq!(sim_stats.counter(stats::TOTAL_READ_LATENCY, 500, freq), Some(60.0));
    assert_eq!(sim_stats.counter(stats::TOTAL_WRITES, 500, freq), Some(1.0));
    assert_eq!(sim_stats.counter(stats::SIM_TICKS, 500, freq), Some(400.0));
    assert_eq!(sim_stats.counter("ipc", 500, freq), None);

    sim_stats.reset(500);
    assert_eq!(sim_stats.window_start(), 500);
    assert_eq!(sim_stats.counter(stats::BYTES_READ, 600, freq), Some(0.0));
    assert_eq!(sim_stats.counter(stats::FINAL_TICK, 600, freq), Some(600.0));
    assert!(stats::is_instantaneous(stats::SIM_FREQ));
    assert!(!stats::is_instantaneous(stats::SIM_TICKS));
}

/// Tests the text report.
#[test]
fn test_snapshot_dump() {
    let snapshot = snapshot_of(
        42,
        &[(stats::SIM_INSTS, 1_000.0), (stats::NUM_CYCLES, 500.0)],
    );
    let report = snapshot.dump();

    assert!(report.contains("SIMULATION STATISTICS @ tick 42"));
    assert!(report.contains("sim_insts"));
    assert!(report.contains("2.0000"));
}
