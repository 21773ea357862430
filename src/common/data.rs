//! Memory Access Types.
//!
//! This module defines the classification of memory requests issued by the
//! simulated cores and the synthetic traffic generator. Memory controllers
//! and the statistics accumulators use it to keep read and write traffic
//! apart.

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Data read access.
    ///
    /// Counted in `bytes_read`, `total_reads` and `total_read_latency`.
    Read,

    /// Data write access.
    ///
    /// Counted in `bytes_written`, `total_writes` and `total_write_latency`.
    Write,
}
