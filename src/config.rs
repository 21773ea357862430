use crate::common::units::{parse_duration, parse_frequency, Bandwidth};
use crate::common::{SimError, SimResult, Tick};
use crate::core::{CoreVariant, CpuModel};
use crate::soc::memory::{MemoryBackend, BLOCK_BYTES};
use crate::soc::traffic::TrafficPattern;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_START_PC: u64 = 0x8000_0000;
const DEFAULT_CLK_FREQ: &str = "3GHz";
const DEFAULT_ADDRESS_LIMIT: u64 = 1 << 30;
const DEFAULT_DURATION: &str = "1ms";
const DEFAULT_MAX_OUTSTANDING: usize = 32;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub traffic: TrafficConfig,
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SimError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.board.validate()?;
        self.processor.validate()?;
        self.traffic.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_clk_freq")]
    pub clk_freq: String,

    #[serde(default = "default_memory")]
    pub memory: MemoryBackend,

    #[serde(default = "default_start_pc")]
    pub start_pc: u64,
}

impl BoardConfig {
    pub fn clock_hz(&self) -> SimResult<u64> {
        parse_frequency(&self.clk_freq)
    }

    fn validate(&self) -> SimResult<()> {
        self.clock_hz().map(|_| ())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            clk_freq: default_clk_freq(),
            memory: default_memory(),
            start_pc: default_start_pc(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_num_cores")]
    pub num_cores: usize,

    /// Variants each element can switch between; the first one starts active.
    #[serde(default = "default_variants")]
    pub variants: Vec<CoreVariant>,
}

impl ProcessorConfig {
    fn validate(&self) -> SimResult<()> {
        if self.num_cores == 0 {
            return Err(SimError::Configuration(
                "processor needs at least one core".to_string(),
            ));
        }
        if self.variants.is_empty() {
            return Err(SimError::Configuration(
                "processor needs at least one core variant".to_string(),
            ));
        }
        self.variants.iter().try_for_each(CoreVariant::validate)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            num_cores: default_num_cores(),
            variants: default_variants(),
        }
    }
}

/// Options of the traffic generator scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficConfig {
    #[serde(default = "default_pattern")]
    pub pattern: TrafficPattern,

    #[serde(default)]
    pub rate: Bandwidth,

    /// Percentage of requests that are reads.
    #[serde(default = "default_read_fraction")]
    pub read_fraction: u32,

    /// Requests target `[0, address_limit)`.
    #[serde(default = "default_address_limit")]
    pub address_limit: u64,

    #[serde(default = "default_duration")]
    pub duration: String,

    #[serde(default = "default_memory")]
    pub memory_backend: MemoryBackend,

    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: usize,

    #[serde(default = "default_clk_freq")]
    pub clk_freq: String,
}

impl TrafficConfig {
    /// Builds the configuration from the four positional command-line values.
    ///
    /// Every other option keeps its default.
    pub fn from_args(rate: &str, read_fraction: u32, memory: &str, address_limit: u64) -> SimResult<Self> {
        let config = Self {
            rate: rate.parse()?,
            read_fraction,
            memory_backend: memory.parse()?,
            address_limit,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn duration_ticks(&self) -> SimResult<Tick> {
        parse_duration(&self.duration)
    }

    pub fn clock_hz(&self) -> SimResult<u64> {
        parse_frequency(&self.clk_freq)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.read_fraction > 100 {
            return Err(SimError::Configuration(format!(
                "read percentage {} is above 100",
                self.read_fraction
            )));
        }
        if self.address_limit < BLOCK_BYTES {
            return Err(SimError::Configuration(format!(
                "address limit {} is smaller than one {}-byte block",
                self.address_limit, BLOCK_BYTES
            )));
        }
        if self.duration_ticks()? == 0 {
            return Err(SimError::Configuration(
                "traffic duration must be positive".to_string(),
            ));
        }
        if self.max_outstanding == 0 {
            return Err(SimError::Configuration(
                "at least one outstanding request is required".to_string(),
            ));
        }
        self.clock_hz().map(|_| ())
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            rate: Bandwidth::default(),
            read_fraction: default_read_fraction(),
            address_limit: default_address_limit(),
            duration: default_duration(),
            memory_backend: default_memory(),
            seed: 0,
            max_outstanding: default_max_outstanding(),
            clk_freq: default_clk_freq(),
        }
    }
}

fn default_clk_freq() -> String {
    DEFAULT_CLK_FREQ.to_string()
}

fn default_memory() -> MemoryBackend {
    MemoryBackend::Simple
}

fn default_start_pc() -> u64 {
    DEFAULT_START_PC
}

fn default_num_cores() -> usize {
    1
}

fn default_variants() -> Vec<CoreVariant> {
    vec![
        CoreVariant::simple(CpuModel::Kvm),
        CoreVariant::simple(CpuModel::Timing),
    ]
}

fn default_pattern() -> TrafficPattern {
    TrafficPattern::Random
}

fn default_read_fraction() -> u32 {
    100
}

fn default_address_limit() -> u64 {
    DEFAULT_ADDRESS_LIMIT
}

fn default_duration() -> String {
    DEFAULT_DURATION.to_string()
}

fn default_max_outstanding() -> usize {
    DEFAULT_MAX_OUTSTANDING
}
