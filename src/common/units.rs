//! Simulated Time and Quantity Parsing.
//!
//! Simulated time advances in ticks of one picosecond. Configuration files
//! and the command line spell frequencies, durations, sizes and bandwidths
//! with units (`"3GHz"`, `"1ms"`, `"1GiB"`, `"32GiB/s"`); the helpers here
//! turn those strings into plain numbers or reject them with
//! [`SimError::Configuration`].

use super::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Simulated time, in picoseconds.
pub type Tick = u64;

/// Number of ticks in one simulated second.
pub const TICKS_PER_SECOND: u64 = 1_000_000_000_000;

/// Bytes in one gibibyte, used when reporting bandwidth.
pub const GIB: f64 = (1u64 << 30) as f64;

/// Splits `"2.5GHz"` into `(2.5, "GHz")`.
fn split_quantity(s: &str) -> SimResult<(f64, &str)> {
    let s = s.trim();
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '_'))
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(idx);
    let num: String = num.chars().filter(|c| *c != '_').collect();
    let value = num
        .parse::<f64>()
        .map_err(|_| SimError::Configuration(format!("'{}' has no numeric value", s)))?;
    Ok((value, unit.trim()))
}

/// Parses a clock frequency such as `"3GHz"` into hertz.
pub fn parse_frequency(s: &str) -> SimResult<u64> {
    let (value, unit) = split_quantity(s)?;
    let scale = match unit {
        "Hz" | "" => 1.0,
        "kHz" | "KHz" => 1e3,
        "MHz" => 1e6,
        "GHz" => 1e9,
        _ => {
            return Err(SimError::Configuration(format!(
                "unknown frequency unit in '{}'",
                s
            )))
        }
    };
    let hz = (value * scale).round() as u64;
    if hz == 0 || hz > TICKS_PER_SECOND {
        return Err(SimError::Configuration(format!(
            "frequency '{}' is outside 1Hz..1THz",
            s
        )));
    }
    Ok(hz)
}

/// Parses a duration such as `"1ms"` or `"20ns"` into ticks.
pub fn parse_duration(s: &str) -> SimResult<Tick> {
    let (value, unit) = split_quantity(s)?;
    let scale = match unit {
        "ps" | "" => 1.0,
        "ns" => 1e3,
        "us" => 1e6,
        "ms" => 1e9,
        "s" => 1e12,
        _ => {
            return Err(SimError::Configuration(format!(
                "unknown time unit in '{}'",
                s
            )))
        }
    };
    Ok((value * scale).round() as Tick)
}

/// Parses a byte size such as `"1GiB"` or `"32KiB"`.
pub fn parse_size(s: &str) -> SimResult<u64> {
    let (value, unit) = split_quantity(s)?;
    Ok((value * byte_scale(unit, s)?).round() as u64)
}

fn byte_scale(unit: &str, original: &str) -> SimResult<f64> {
    let scale = match unit {
        "B" | "" => 1.0,
        "kB" | "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => GIB,
        _ => {
            return Err(SimError::Configuration(format!(
                "unknown size unit in '{}'",
                original
            )))
        }
    };
    Ok(scale)
}

/// Converts a frequency to the number of ticks in one clock period.
pub fn period_ticks(frequency_hz: u64) -> Tick {
    (TICKS_PER_SECOND / frequency_hz.max(1)).max(1)
}

/// A bandwidth target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bandwidth {
    /// No throttling; the requester issues as fast as its clock allows.
    #[default]
    Unbounded,
    /// A fixed number of bytes per simulated second.
    BytesPerSecond(f64),
}

impl Bandwidth {
    /// Ticks needed to move `bytes` at this bandwidth, or `None` if unbounded.
    pub fn ticks_for(&self, bytes: u64) -> Option<Tick> {
        match self {
            Bandwidth::Unbounded => None,
            Bandwidth::BytesPerSecond(bps) => {
                Some(((bytes as f64 / bps) * TICKS_PER_SECOND as f64).ceil().max(1.0) as Tick)
            }
        }
    }
}

impl FromStr for Bandwidth {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unbounded") || trimmed == "0" {
            return Ok(Bandwidth::Unbounded);
        }
        let Some(per_second) = trimmed.strip_suffix("/s") else {
            return Err(SimError::Configuration(format!(
                "bandwidth '{}' must end in '/s' or be 'unbounded'",
                s
            )));
        };
        let (value, unit) = split_quantity(per_second)?;
        let bps = value * byte_scale(unit, s)?;
        if bps <= 0.0 {
            return Err(SimError::Configuration(format!(
                "bandwidth '{}' must be positive",
                s
            )));
        }
        Ok(Bandwidth::BytesPerSecond(bps))
    }
}

impl TryFrom<String> for Bandwidth {
    type Error = SimError;

    fn try_from(s: String) -> SimResult<Self> {
        s.parse()
    }
}

impl From<Bandwidth> for String {
    fn from(b: Bandwidth) -> String {
        b.to_string()
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bandwidth::Unbounded => write!(f, "unbounded"),
            Bandwidth::BytesPerSecond(bps) => write!(f, "{}B/s", bps),
        }
    }
}
