//! Common utilities and types used throughout the orchestration core.
//!
//! This module provides the error taxonomy, simulated-time units and
//! memory access classification shared by the engines, the dispatcher and
//! the harnesses.

/// Memory access type definitions.
pub mod data;

/// Error types for configuration, precondition, lookup, engine and metric failures.
pub mod error;

/// Simulated time and quantity parsing.
pub mod units;

pub use data::AccessType;
pub use error::{SimError, SimResult};
pub use units::{Tick, GIB, TICKS_PER_SECOND};
