//! Simulation Engine Interface.
//!
//! The orchestration core consumes exactly these primitives. The engine owns
//! simulated time; advancing it through `run_until_pause` is the only way
//! time progresses, and the engine is paused whenever any other method is
//! called.

use super::event::RunOutcome;
use crate::common::{SimResult, Tick, TICKS_PER_SECOND};
use crate::core::CoreSwitchController;

/// A tick-based simulation that can be advanced to its next pause point.
pub trait SimulationEngine {
    /// Advances simulated time until the next pause.
    ///
    /// # Errors
    ///
    /// `EngineFault` if the engine hits an internal fault. The engine is
    /// unusable afterwards.
    fn run_until_pause(&mut self) -> SimResult<RunOutcome>;

    /// Current simulated tick.
    fn current_tick(&self) -> Tick;

    /// Ticks per simulated second.
    fn tick_frequency(&self) -> u64 {
        TICKS_PER_SECOND
    }

    /// Reads one counter, or `None` if the engine has no such counter.
    fn read_counter(&self, name: &str) -> Option<f64>;

    /// Names of every counter `read_counter` answers for.
    fn counter_names(&self) -> Vec<String>;

    /// Zeroes cumulative counters; instantaneous counters are untouched.
    fn reset_counters(&mut self);

    /// Makes the engine pause with `MaxTick` once simulated time reaches `tick`.
    fn set_tick_bound(&mut self, tick: Tick);

    /// The switchable processor, if the engine simulates processing elements.
    fn processor(&self) -> Option<&CoreSwitchController> {
        None
    }

    fn processor_mut(&mut self) -> Option<&mut CoreSwitchController> {
        None
    }
}
