//! Memory Timing Controllers.
//!
//! This module defines the `MemoryController` trait and the timing models
//! behind the memory backends. Each controller answers one question: if a
//! block request arrives at tick `now`, when is its response ready? Every
//! model tracks the tick until which its data path is busy, so requests
//! issued faster than the backend can move data queue up and bandwidth
//! saturates.

use crate::common::{AccessType, Tick};

/// Trait for memory controller implementations.
pub trait MemoryController {
    /// Returns the user-friendly name of the controller.
    fn name(&self) -> &str;

    /// Services one block access issued at `now`.
    ///
    /// # Arguments
    ///
    /// * `addr` - The physical address being accessed.
    /// * `kind` - Read or write.
    /// * `now` - Tick at which the request reaches the controller.
    ///
    /// # Returns
    ///
    /// The tick at which the response is ready (never earlier than `now`).
    fn access(&mut self, addr: u64, kind: AccessType, now: Tick) -> Tick;

    /// Latency `addr` would see on an idle controller.
    ///
    /// Does not occupy the data path or change any controller state. Atomic
    /// and fast-forward cores use it so that their accesses leave no backlog.
    fn idle_latency(&self, addr: u64, kind: AccessType) -> Tick;
}

/// A memory with fixed latency and a bandwidth limit.
///
/// Models an ideal memory system where every access takes a constant amount
/// of time once it gets the data path, ignoring row buffer locality.
pub struct SimpleController {
    /// Fixed latency per access.
    latency: Tick,
    /// Ticks the data path is occupied per block.
    transfer: Tick,
    busy_until: Tick,
}

impl SimpleController {
    /// Creates a new SimpleController.
    ///
    /// # Arguments
    ///
    /// * `latency` - The fixed access latency in ticks.
    /// * `transfer` - Data path occupancy per block in ticks.
    pub fn new(latency: Tick, transfer: Tick) -> Self {
        Self {
            latency,
            transfer,
            busy_until: 0,
        }
    }
}

impl MemoryController for SimpleController {
    fn name(&self) -> &str {
        "SimpleMemory"
    }

    /// Returns the fixed latency plus any wait for the data path.
    fn access(&mut self, _addr: u64, _kind: AccessType, now: Tick) -> Tick {
        let start = now.max(self.busy_until);
        self.busy_until = start + self.transfer;
        self.busy_until + self.latency
    }

    fn idle_latency(&self, _addr: u64, _kind: AccessType) -> Tick {
        self.transfer + self.latency
    }
}

/// DRAM timing parameters, in ticks.
#[derive(Clone, Copy, Debug)]
pub struct DramTiming {
    /// Column Access Strobe latency (Column command to data).
    pub t_cas: Tick,
    /// Row Access Strobe latency (Row Active command to Column command).
    pub t_ras: Tick,
    /// Precharge latency (Precharge command to Row Active command).
    pub t_pre: Tick,
    /// Time to burst one block over the channel.
    pub t_burst: Tick,
    /// Bytes per row buffer.
    pub row_bytes: u64,
}

/// A DRAM-aware memory controller for one channel.
///
/// Tracks the currently open row to model row buffer hits (lower latency)
/// and misses (higher latency).
pub struct DramController {
    /// The index of the currently open row, if any.
    last_row: Option<u64>,
    timing: DramTiming,
    /// Bitmask used to extract the row index from a physical address.
    row_mask: u64,
    busy_until: Tick,
}

impl DramController {
    /// Creates a new DramController with every row closed.
    pub fn new(timing: DramTiming) -> Self {
        let row_bytes = timing.row_bytes.max(1).next_power_of_two();
        Self {
            last_row: None,
            timing,
            row_mask: !(row_bytes - 1),
            busy_until: 0,
        }
    }

    /// Latency to reach the column for `addr`, updating the open row.
    ///
    /// * **Row Hit:** If the requested row is already open, latency is just `t_cas`.
    /// * **Row Miss (Open):** A different row must be precharged first: `t_pre + t_ras + t_cas`.
    /// * **Row Miss (Closed):** The row must be activated: `t_ras + t_cas`.
    fn row_latency(&mut self, addr: u64) -> Tick {
        let latency = self.peek_row_latency(addr);
        self.last_row = Some(addr & self.row_mask);
        latency
    }

    fn peek_row_latency(&self, addr: u64) -> Tick {
        let t = self.timing;
        match self.last_row {
            Some(open_row) if open_row == addr & self.row_mask => t.t_cas,
            Some(_) => t.t_pre + t.t_ras + t.t_cas,
            None => t.t_ras + t.t_cas,
        }
    }
}

impl MemoryController for DramController {
    fn name(&self) -> &str {
        "DRAM"
    }

    fn access(&mut self, addr: u64, _kind: AccessType, now: Tick) -> Tick {
        let start = now.max(self.busy_until);
        let column_ready = start + self.row_latency(addr);
        // Commands to the next request overlap with this burst.
        self.busy_until = column_ready - self.timing.t_cas + self.timing.t_burst;
        column_ready + self.timing.t_burst
    }

    fn idle_latency(&self, addr: u64, _kind: AccessType) -> Tick {
        self.peek_row_latency(addr) + self.timing.t_burst
    }
}

/// Several independent channels behind one address interleave.
pub struct ChanneledController {
    name: String,
    channels: Vec<Box<dyn MemoryController>>,
    interleave: u64,
}

impl ChanneledController {
    /// Creates a controller striping `interleave`-byte chunks across `channels`.
    pub fn new(
        name: impl Into<String>,
        channels: Vec<Box<dyn MemoryController>>,
        interleave: u64,
    ) -> Self {
        Self {
            name: name.into(),
            channels,
            interleave: interleave.max(1),
        }
    }

    /// Number of independent channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Maps a global address to `(channel, channel-local address)`.
    pub fn route(&self, addr: u64) -> (usize, u64) {
        let n = self.channels.len().max(1) as u64;
        let chunk = addr / self.interleave;
        let channel = (chunk % n) as usize;
        let local = (chunk / n) * self.interleave + addr % self.interleave;
        (channel, local)
    }
}

impl MemoryController for ChanneledController {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, addr: u64, kind: AccessType, now: Tick) -> Tick {
        let (channel, local) = self.route(addr);
        match self.channels.get_mut(channel) {
            Some(ctrl) => ctrl.access(local, kind, now),
            None => now,
        }
    }

    fn idle_latency(&self, addr: u64, kind: AccessType) -> Tick {
        let (channel, local) = self.route(addr);
        self.channels
            .get(channel)
            .map_or(0, |ctrl| ctrl.idle_latency(local, kind))
    }
}
