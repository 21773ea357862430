//! Memory system models used by the reference engines.

/// Backend selection and presets.
pub mod backend;

/// Timing models for fixed-latency, DRAM and multi-channel memories.
pub mod controller;

pub use backend::{MemoryBackend, BLOCK_BYTES};
pub use controller::MemoryController;
