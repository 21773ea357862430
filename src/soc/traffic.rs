//! Synthetic Address-Stream Generator.
//!
//! Produces the stream of block requests a traffic generator core issues:
//! either a linear sweep through `[0, address_limit)` or uniformly random
//! block-aligned addresses in the same range. Whether each request reads or
//! writes is drawn against the configured read percentage. Randomness comes
//! from a seeded ChaCha generator so a run is reproducible from its seed.

use crate::common::{AccessType, SimError, SimResult};
use crate::soc::memory::BLOCK_BYTES;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address pattern of a traffic generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficPattern {
    Linear,
    Random,
}

impl FromStr for TrafficPattern {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(TrafficPattern::Linear),
            "random" => Ok(TrafficPattern::Random),
            _ => Err(SimError::Configuration(format!(
                "unknown traffic pattern '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for TrafficPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficPattern::Linear => f.write_str("linear"),
            TrafficPattern::Random => f.write_str("random"),
        }
    }
}

/// Stateful request source.
pub struct TrafficGenerator {
    pattern: TrafficPattern,
    blocks: u64,
    read_fraction: u32,
    next_block: u64,
    rng: ChaCha8Rng,
}

impl TrafficGenerator {
    /// Creates a generator over `[0, address_limit)`.
    ///
    /// # Errors
    ///
    /// `Configuration` if the range holds no complete block or
    /// `read_fraction` exceeds 100.
    pub fn new(
        pattern: TrafficPattern,
        address_limit: u64,
        read_fraction: u32,
        seed: u64,
    ) -> SimResult<Self> {
        let blocks = address_limit / BLOCK_BYTES;
        if blocks == 0 {
            return Err(SimError::Configuration(format!(
                "address limit {} is smaller than one {}-byte block",
                address_limit, BLOCK_BYTES
            )));
        }
        if read_fraction > 100 {
            return Err(SimError::Configuration(format!(
                "read percentage {} is above 100",
                read_fraction
            )));
        }
        Ok(Self {
            pattern,
            blocks,
            read_fraction,
            next_block: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Address pattern of this stream.
    pub fn pattern(&self) -> TrafficPattern {
        self.pattern
    }

    /// Draws the next request.
    pub fn next_request(&mut self) -> (u64, AccessType) {
        let block = match self.pattern {
            TrafficPattern::Linear => {
                let b = self.next_block;
                self.next_block = (self.next_block + 1) % self.blocks;
                b
            }
            TrafficPattern::Random => self.rng.gen_range(0..self.blocks),
        };
        let kind = if self.rng.gen_range(0..100u32) < self.read_fraction {
            AccessType::Read
        } else {
            AccessType::Write
        };
        (block * BLOCK_BYTES, kind)
    }
}
