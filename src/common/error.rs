//! Error taxonomy for the orchestration core.
//!
//! Every fallible operation in the crate returns [`SimResult`]. The variants
//! mirror the points at which a run can go wrong: before simulation starts
//! (`Configuration`), when an operation is invoked outside its pause context
//! (`PreconditionViolation`), when a referenced element or counter does not
//! exist (`NotFound`), when the engine itself fails (`EngineFault`) and when a
//! derived metric has a zero denominator (`DivideByZero`).

use thiserror::Error;

/// Errors that can occur while configuring, running or measuring a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A configuration value is malformed or unsupported.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation was invoked outside its required pause or phase context.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// A referenced element, variant, counter or handler does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The simulation engine reported an internal fault.
    #[error("engine fault: {0}")]
    EngineFault(String),

    /// A derived metric was computed with a zero denominator.
    #[error("division by zero while computing {0}")]
    DivideByZero(String),
}

/// A type alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Process exit code reported by the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Configuration(_) => 2,
            SimError::PreconditionViolation(_) => 3,
            SimError::NotFound(_) => 4,
            SimError::EngineFault(_) => 5,
            SimError::DivideByZero(_) => 6,
        }
    }

    /// Returns `true` if the error was raised before any simulated time was spent.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SimError::Configuration(_))
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Configuration(err.to_string())
    }
}
