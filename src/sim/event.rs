//! Exit Events.
//!
//! An exit event is the engine handing control back to the orchestration
//! layer. Its category decides which handlers run; its cause is free text
//! for humans.

use crate::common::Tick;
use serde::Serialize;
use std::fmt;

/// Classification of a simulation pause, used for handler routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExitCategory {
    /// The workload finished booting.
    Boot,
    /// The workload entered a region of interest.
    WorkRegionBegin,
    /// The workload left a region of interest.
    WorkRegionEnd,
    /// A workload-requested exit with no specific meaning.
    Generic,
    /// The tick bound set through `set_tick_bound` was reached.
    MaxTick,
    /// The workload or generator has nothing left to do.
    Terminal,
}

impl ExitCategory {
    /// All categories, in declaration order.
    pub const ALL: [ExitCategory; 6] = [
        ExitCategory::Boot,
        ExitCategory::WorkRegionBegin,
        ExitCategory::WorkRegionEnd,
        ExitCategory::Generic,
        ExitCategory::MaxTick,
        ExitCategory::Terminal,
    ];
}

impl fmt::Display for ExitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitCategory::Boot => "boot",
            ExitCategory::WorkRegionBegin => "workbegin",
            ExitCategory::WorkRegionEnd => "workend",
            ExitCategory::Generic => "exit",
            ExitCategory::MaxTick => "max_tick",
            ExitCategory::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// One pause of the simulation, consumed exactly once by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExitEvent {
    /// Classification used to route the event.
    pub category: ExitCategory,
    /// Human-readable reason reported by the engine.
    pub cause: String,
    /// Simulated tick of the pause.
    pub tick: Tick,
}

impl ExitEvent {
    /// Creates an event raised at `tick`.
    pub fn new(category: ExitCategory, cause: impl Into<String>, tick: Tick) -> Self {
        Self {
            category,
            cause: cause.into(),
            tick,
        }
    }
}

impl fmt::Display for ExitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ tick {}: {}", self.category, self.tick, self.cause)
    }
}

/// Result of one `run_until_pause` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine paused and produced an exit event.
    Paused(ExitEvent),
    /// The engine has no more pausing points.
    Completed,
}
