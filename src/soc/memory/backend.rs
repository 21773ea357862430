//! Memory Backend Selection.
//!
//! The three memory systems a board can be built with, and the controller
//! stacks they expand into. Backend names come from configuration files and
//! the command line; anything unrecognized is a configuration error raised
//! before a board exists.

use super::controller::{
    ChanneledController, DramController, DramTiming, MemoryController, SimpleController,
};
use crate::common::{SimError, SimResult, Tick};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size of every request moved by a backend, in bytes.
pub const BLOCK_BYTES: u64 = 64;

const SIMPLE_LATENCY: Tick = 20_000;
/// 64 bytes at 32 GiB/s.
const SIMPLE_TRANSFER: Tick = 1_863;

const DDR4_2400: DramTiming = DramTiming {
    t_cas: 14_160,
    t_ras: 14_160,
    t_pre: 14_160,
    t_burst: 3_332,
    row_bytes: 8192,
};
const DDR4_CHANNELS: usize = 2;

const LPDDR5_6400: DramTiming = DramTiming {
    t_cas: 20_000,
    t_ras: 18_000,
    t_pre: 18_000,
    t_burst: 5_000,
    row_bytes: 2048,
};
const LPDDR5_CHANNELS: usize = 4;

/// Memory system attached to a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MemoryBackend {
    /// Single channel, fixed 20 ns latency, 32 GiB/s.
    Simple,
    /// Dual-channel DDR4-2400 with row-buffer timing.
    Ddr4,
    /// Four LPDDR5-6400 x16 channels, 64-byte interleave.
    Lpddr5,
}

impl MemoryBackend {
    /// Builds a fresh controller stack for this backend.
    pub fn build(self) -> Box<dyn MemoryController> {
        match self {
            MemoryBackend::Simple => Box::new(SimpleController::new(SIMPLE_LATENCY, SIMPLE_TRANSFER)),
            MemoryBackend::Ddr4 => Box::new(dram_channels("DualChannelDDR4_2400", DDR4_2400, DDR4_CHANNELS)),
            MemoryBackend::Lpddr5 => {
                Box::new(dram_channels("ChanneledLPDDR5_6400", LPDDR5_6400, LPDDR5_CHANNELS))
            }
        }
    }
}

fn dram_channels(name: &str, timing: DramTiming, channels: usize) -> ChanneledController {
    let channels = (0..channels)
        .map(|_| Box::new(DramController::new(timing)) as Box<dyn MemoryController>)
        .collect();
    ChanneledController::new(name, channels, BLOCK_BYTES)
}

impl FromStr for MemoryBackend {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s.trim() {
            "simple" | "Simple" | "SingleChannelSimpleMemory" => Ok(MemoryBackend::Simple),
            "ddr4" | "DDR4" | "DualChannelDDR4_2400" => Ok(MemoryBackend::Ddr4),
            "lpddr5" | "LPDDR5" | "SC_LPDDR5" => Ok(MemoryBackend::Lpddr5),
            other => Err(SimError::Configuration(format!(
                "unrecognized memory backend '{}' (expected simple, DDR4 or SC_LPDDR5)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for MemoryBackend {
    type Error = SimError;

    fn try_from(s: String) -> SimResult<Self> {
        s.parse()
    }
}

impl From<MemoryBackend> for String {
    fn from(b: MemoryBackend) -> String {
        b.to_string()
    }
}

impl fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryBackend::Simple => "simple",
            MemoryBackend::Ddr4 => "DDR4",
            MemoryBackend::Lpddr5 => "SC_LPDDR5",
        };
        f.write_str(name)
    }
}
