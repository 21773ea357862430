//! Processing elements and their interchangeable core variants.
//!
//! An element owns its architectural state; a variant only describes how
//! fast that state advances. Switching replaces the variant and discards
//! its pipeline state, never the architectural state.

/// Architectural state: program counter, registers, in-flight memory references.
pub mod arch;

/// The switchable processor and its pause-gated switch operation.
pub mod switch;

/// Core variant descriptions and the performance they imply.
pub mod variant;

pub use switch::{CoreSwitchController, ExecState, PipelineState, ProcessingElement};
pub use variant::{CoreVariant, CpuModel};
