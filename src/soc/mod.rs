//! Memory system and synthetic traffic components.
//!
//! These are the hardware stand-ins the reference engines are assembled
//! from. The orchestration layer never touches them directly; it only reads
//! the counters the engines derive from them.

/// Memory controllers and backend presets.
pub mod memory;

/// Linear and random address-stream generation.
pub mod traffic;

pub use memory::{MemoryBackend, MemoryController};
pub use traffic::{TrafficGenerator, TrafficPattern};
