//! Guidance controller configuration.
//!
//! A `ControllerConfig` is a plain value: the simulator receives one at
//! construction and builds its controller from it. There is no process-wide
//! default controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Pid,
    Lqr,
    Mpc,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 3] = [ControllerKind::Pid, ControllerKind::Lqr, ControllerKind::Mpc];

    pub fn as_str(self) -> &'static str {
        match self {
            ControllerKind::Pid => "pid",
            ControllerKind::Lqr => "lqr",
            ControllerKind::Mpc => "mpc",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pid" => Ok(ControllerKind::Pid),
            "lqr" => Ok(ControllerKind::Lqr),
            "mpc" => Ok(ControllerKind::Mpc),
            _ => Err(ConfigError::UnknownControllerKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-variant parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Target vertical velocity, m/s.
    pub setpoint: f64,
    /// Desired-acceleration limits (min, max), m/s^2.
    pub output_limits: Option<(f64, f64)>,
    /// Altitude below which the simulator engages the controller.
    pub activation_altitude: Option<f64>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 300.0,
            ki: 0.0,
            kd: 120.0,
            setpoint: -10.0,
            output_limits: None,
            activation_altitude: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LqrConfig {
    /// State cost on [position error, velocity error].
    pub q: [[f64; 2]; 2],
    pub r: f64,
    pub setpoint: f64,
    pub output_limits: Option<(f64, f64)>,
    pub activation_altitude: Option<f64>,
}

impl Default for LqrConfig {
    fn default() -> Self {
        Self {
            q: [[0.01, 0.0], [0.0, 200.0]],
            r: 1.0,
            setpoint: -10.0,
            output_limits: None,
            activation_altitude: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcConfig {
    pub horizon: usize,
    pub q: [[f64; 2]; 2],
    pub r: f64,
    pub setpoint: f64,
    /// Control box (min, max), m/s^2. Always present for MPC.
    pub output_limits: (f64, f64),
    /// Nominal discretization step, s.
    pub dt_nom: f64,
    /// Gravity used as the model disturbance, m/s^2.
    pub gravity: f64,
    pub activation_altitude: Option<f64>,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            q: [[0.01, 0.0], [0.0, 200.0]],
            r: 1.0,
            setpoint: -20.0,
            output_limits: (-50.0, 20.0),
            dt_nom: 0.1,
            gravity: 9.81,
            activation_altitude: Some(500.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// `kind = "pid" | "lqr" | "mpc"` plus that variant's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControllerConfig {
    Pid(PidConfig),
    Lqr(LqrConfig),
    Mpc(MpcConfig),
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::Lqr(LqrConfig::default())
    }
}

impl ControllerConfig {
    /// Default tuning for a kind.
    pub fn defaults(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::Pid => ControllerConfig::Pid(PidConfig::default()),
            ControllerKind::Lqr => ControllerConfig::Lqr(LqrConfig::default()),
            ControllerKind::Mpc => ControllerConfig::Mpc(MpcConfig::default()),
        }
    }

    /// Default tuning for a kind given by name; unknown names are an error.
    pub fn from_kind_name(kind: &str) -> Result<Self, ConfigError> {
        Ok(Self::defaults(kind.parse()?))
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            ControllerConfig::Pid(_) => ControllerKind::Pid,
            ControllerConfig::Lqr(_) => ControllerKind::Lqr,
            ControllerConfig::Mpc(_) => ControllerKind::Mpc,
        }
    }

    pub fn setpoint(&self) -> f64 {
        match self {
            ControllerConfig::Pid(c) => c.setpoint,
            ControllerConfig::Lqr(c) => c.setpoint,
            ControllerConfig::Mpc(c) => c.setpoint,
        }
    }

    pub fn activation_altitude(&self) -> Option<f64> {
        match self {
            ControllerConfig::Pid(c) => c.activation_altitude,
            ControllerConfig::Lqr(c) => c.activation_altitude,
            ControllerConfig::Mpc(c) => c.activation_altitude,
        }
    }

    /// Same config with a new velocity setpoint.
    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        match &mut self {
            ControllerConfig::Pid(c) => c.setpoint = setpoint,
            ControllerConfig::Lqr(c) => c.setpoint = setpoint,
            ControllerConfig::Mpc(c) => c.setpoint = setpoint,
        }
        self
    }

    pub fn with_activation_altitude(mut self, altitude: Option<f64>) -> Self {
        match &mut self {
            ControllerConfig::Pid(c) => c.activation_altitude = altitude,
            ControllerConfig::Lqr(c) => c.activation_altitude = altitude,
            ControllerConfig::Mpc(c) => c.activation_altitude = altitude,
        }
        self
    }
}

pub(crate) fn check_limits(limits: (f64, f64)) -> Result<(), ConfigError> {
    let (lo, hi) = limits;
    if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
        return Err(ConfigError::invalid(
            "output_limits",
            format!("need finite min <= max, got ({lo}, {hi})"),
        ));
    }
    Ok(())
}

pub(crate) fn check_cost(q: &[[f64; 2]; 2], r: f64) -> Result<(), ConfigError> {
    if q.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ConfigError::invalid("q", "entries must be finite"));
    }
    if !(r > 0.0 && r.is_finite()) {
        return Err(ConfigError::invalid("r", format!("must be finite and > 0, got {r}")));
    }
    Ok(())
}
