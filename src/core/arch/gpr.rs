//! Architectural General-Purpose Register File.
//!
//! Each processing element owns one register file that belongs to the
//! element, not to whichever core variant is currently executing on it.
//! Register x0 is hardwired to zero.

/// Number of architectural integer registers.
pub const NUM_GPRS: usize = 32;

/// General-Purpose Register file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gpr {
    regs: [u64; NUM_GPRS],
}

impl Default for Gpr {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpr {
    /// Creates a new register file with all registers initialized to zero.
    pub fn new() -> Self {
        Self {
            regs: [0; NUM_GPRS],
        }
    }

    /// Reads a general-purpose register value.
    ///
    /// Register x0 always returns 0 regardless of storage.
    pub fn read(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.regs[idx]
        }
    }

    /// Writes a value to a general-purpose register.
    ///
    /// Writes to x0 are silently ignored.
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx != 0 {
            self.regs[idx] = val;
        }
    }
}
