//! Architectural state of a processing element.
//!
//! This is the state that must be coherent across core variants: it is
//! owned by the element and handed untouched from one variant to the next.

/// General-Purpose Register file implementation.
pub mod gpr;

/// Program counter, registers and in-flight memory references.
pub mod state;

pub use gpr::Gpr;
pub use state::{ArchState, MemRef};
