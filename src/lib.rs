//! Simulation Phase Orchestration Library.
//!
//! This crate drives a pausable, tick-based simulation engine through a
//! measurement methodology: fast-forward to a region of interest, swap the
//! processing elements to a detailed core variant, reset statistics, measure
//! and stop. It also provides a self-contained traffic-generator scenario for
//! characterising memory backends.
//!
//! # Architecture
//!
//! * **Dispatcher**: owns the engine, runs it to each pause and resumes the
//!   handlers registered for the pause's category.
//! * **Handlers**: resumable tasks that keep their captured state between
//!   pauses and answer `Continue` or `Stop`.
//! * **Core switching**: pause-gated activation of alternative core variants
//!   that preserves architectural state.
//! * **Statistics**: named counter snapshots, window resets and derived
//!   bandwidth/latency metrics.
//!
//! # Modules
//!
//! * `common`: Shared types, simulated-time units and error handling.
//! * `config`: Configuration loading and parsing.
//! * `core`: Processing elements, core variants and the switch controller.
//! * `sim`: Dispatcher, phase controller, harness and reference engines.
//! * `soc`: Memory backends and traffic generation.
//! * `stats`: Statistics sampling and derived metrics.

/// Shared types, simulated-time units and error handling.
///
/// Provides the error taxonomy every fallible operation returns, the tick
/// type and the parsers for frequencies, durations, sizes and bandwidths.
pub mod common;

/// Configuration system for the board, processor and traffic scenario.
///
/// Loads and parses TOML configuration files; every field has a default.
pub mod config;

/// Processing elements and core variant switching.
///
/// Each element keeps its architectural state while the controller swaps the
/// variant that models its timing.
pub mod core;

/// Simulation orchestration: dispatcher, handlers, phases and engines.
pub mod sim;

/// Memory controllers and synthetic traffic generation.
pub mod soc;

/// Statistics sampling, snapshots and derived metrics.
///
/// Tracks instructions, cycles and memory request counters and turns them
/// into bandwidth and latency figures.
pub mod stats;
