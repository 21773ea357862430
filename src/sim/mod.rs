//! Simulation orchestration.
//!
//! The dispatcher owns an engine and is the only thing that advances it.
//! Controllers (the phase sequence, the traffic harness) only register
//! handlers; switching cores and sampling statistics happen inside those
//! handlers while the engine is paused.

/// Reference engine running a workload on a switchable processor.
pub mod board;

/// Run loop, handler registration and the handler context.
pub mod dispatcher;

/// The primitives an engine offers the orchestration layer.
pub mod engine;

/// Exit categories and events.
pub mod event;

/// Self-contained memory bandwidth and latency scenario.
pub mod harness;

/// Fast-forward, switch, measure and stop sequence.
pub mod phase;

/// Reference engine driving memory from a traffic generator.
pub mod traffic_board;

/// Scripted synthetic workloads.
pub mod workload;

pub use board::Board;
pub use dispatcher::{
    handler_fn, Decision, ExitEventDispatcher, HandlerTask, RunEnd, RunSummary, SimContext,
    StepSequence, UnhandledExit,
};
pub use engine::SimulationEngine;
pub use event::{ExitCategory, ExitEvent, RunOutcome};
pub use harness::{TrafficGeneratorHarness, TrafficReport};
pub use phase::{PhaseController, PhaseLog, PhasePlan, PhaseRecord, SwitchPlan, TerminalHandler};
pub use traffic_board::TrafficBoard;
pub use workload::{Workload, WorkloadStep};
