//! Error types for configuration, stepping, and the numerical solvers.

use thiserror::Error;

/// Errors raised while building a simulation from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Controller kind string not recognized.
    #[error("unknown controller kind: {0} (expected pid, lqr or mpc)")]
    UnknownControllerKind(String),

    /// Planet name not present in the catalog.
    #[error("unknown planet: {0}")]
    UnknownPlanet(String),

    /// Vehicle name not present in the catalog.
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),

    /// A numeric parameter is outside its valid range.
    #[error("invalid value for {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Emergency scenario parameters are malformed.
    #[error("malformed emergency scenario: {0}")]
    InvalidScenario(String),

    /// Thrust allocation requested for a vehicle without engines.
    #[error("thrust allocator needs at least one engine")]
    NoEngines,

    /// Allocation matrix could not be pseudo-inverted.
    #[error("allocation matrix is degenerate: {0}")]
    DegenerateGeometry(&'static str),

    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors raised by `Simulator::step`.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
}

/// Failures of the optional numerical solvers. These never reach the
/// simulator caller: guidance laws recover with their fallbacks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("linear system is singular")]
    Singular,

    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("non-finite value encountered")]
    NonFinite,

    #[error("solver does not support this system")]
    Unsupported,
}
