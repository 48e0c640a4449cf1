//! Run configuration and TOML scenario files.
//!
//! ```toml
//! planet = "moon"
//! vehicle = "moon_lander"
//! initial_altitude = 800.0      # optional, planet recommendation otherwise
//!
//! [sim]
//! dt = 0.1
//! max_time = 400.0
//!
//! [sim.controller]
//! kind = "pid"
//! setpoint = -2.0
//!
//! [sim.emergency]
//! type = "response_lag"
//! params = { delay = 0.2 }
//! ```

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::emergency::EmergencyScenario;
use crate::error::ConfigError;
use crate::gnc::ControllerConfig;
use crate::physics::presets as planets;
use crate::sim::Simulator;
use crate::vehicle::VehicleKind;

/// What the vehicle does while above the controller's activation altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactivePolicy {
    /// No thrust.
    #[default]
    Coast,
    /// Thrust to cancel gravity (zero desired acceleration).
    HoldVelocity,
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Immutable per-run configuration handed to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
    /// Set from the scenario's top level when loaded from a file.
    #[serde(skip_deserializing)]
    pub initial_altitude: f64,
    #[serde(skip_deserializing)]
    pub initial_velocity: f64,
    /// Body-frame thrust direction; normalized when applied.
    pub thrust_direction: Vector3<f64>,
    pub wind: Vector3<f64>,
    /// `None` runs in manual-thrust mode.
    pub controller: Option<ControllerConfig>,
    pub emergency: EmergencyScenario,
    pub inactive_policy: InactivePolicy,
    /// Touchdown speed above which the landing counts as a crash, m/s.
    pub crash_speed: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            max_time: 300.0,
            initial_altitude: 1000.0,
            initial_velocity: -100.0,
            thrust_direction: Vector3::y(),
            wind: Vector3::zeros(),
            controller: Some(ControllerConfig::default()),
            emergency: EmergencyScenario::Nominal,
            inactive_policy: InactivePolicy::Coast,
            crash_speed: 5.0,
        }
    }
}

impl SimConfig {
    pub fn with_controller(mut self, controller: Option<ControllerConfig>) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_emergency(mut self, emergency: EmergencyScenario) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn with_initial_conditions(mut self, altitude: f64, velocity: f64) -> Self {
        self.initial_altitude = altitude;
        self.initial_velocity = velocity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::invalid("dt", format!("must be finite and > 0, got {}", self.dt)));
        }
        if !(self.max_time > 0.0) {
            return Err(ConfigError::invalid("max_time", "must be > 0"));
        }
        if !(self.initial_altitude.is_finite() && self.initial_velocity.is_finite()) {
            return Err(ConfigError::invalid("initial conditions", "must be finite"));
        }
        let n = self.thrust_direction.norm();
        if !(n > 0.0 && n.is_finite()) {
            return Err(ConfigError::invalid("thrust_direction", "must be a finite non-zero vector"));
        }
        if self.wind.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::invalid("wind", "must be finite"));
        }
        if !(self.crash_speed > 0.0) {
            return Err(ConfigError::invalid("crash_speed", "must be > 0"));
        }
        self.emergency.validate()
    }
}

// ---------------------------------------------------------------------------
// Scenario files
// ---------------------------------------------------------------------------

/// A complete run: planet, vehicle and simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub planet: String,
    pub vehicle: VehicleKind,
    /// Defaults to the planet's recommended entry altitude.
    #[serde(default)]
    pub initial_altitude: Option<f64>,
    /// Defaults to the planet's recommended entry velocity.
    #[serde(default)]
    pub initial_velocity: Option<f64>,
    #[serde(default)]
    pub sim: SimConfig,
}

impl ScenarioConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Resolve presets and build a ready simulator.
    pub fn build(&self) -> Result<Simulator, ConfigError> {
        let planet = planets::by_name(&self.planet)?;
        if !self.vehicle.is_compatible_with(&planet.name) {
            warn!(
                vehicle = %self.vehicle,
                planet = %planet.name,
                "vehicle is not intended for this planet"
            );
        }
        let lander = self.vehicle.build()?;

        let altitude = self
            .initial_altitude
            .or(planet.recommended_altitude)
            .unwrap_or(SimConfig::default().initial_altitude);
        let velocity = self
            .initial_velocity
            .or(planet.recommended_velocity)
            .unwrap_or(SimConfig::default().initial_velocity);
        let sim = self.sim.clone().with_initial_conditions(altitude, velocity);

        info!(
            planet = %planet.name,
            vehicle = %self.vehicle,
            controller = sim.controller.as_ref().map_or("manual", |c| c.kind().as_str()),
            altitude,
            velocity,
            "scenario loaded"
        );
        Simulator::new(planet, lander, sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::ControllerKind;

    const LUNAR: &str = r#"
planet = "Moon"
vehicle = "moon_lander"

[sim]
dt = 0.05
max_time = 500.0

[sim.controller]
kind = "pid"
kp = 250.0
setpoint = -2.0
output_limits = [-5.0, 5.0]

[sim.emergency]
type = "response_lag"
params = { delay = 0.2 }
"#;

    #[test]
    fn parses_full_scenario() {
        let cfg = ScenarioConfig::from_toml_str(LUNAR).unwrap();
        assert_eq!(cfg.vehicle, VehicleKind::MoonLander);
        assert_eq!(cfg.sim.dt, 0.05);
        let controller = cfg.sim.controller.as_ref().unwrap();
        assert_eq!(controller.kind(), ControllerKind::Pid);
        assert_eq!(controller.setpoint(), -2.0);
        assert_eq!(cfg.sim.emergency, EmergencyScenario::ResponseLag { delay: 0.2 });
        // untouched fields keep their defaults
        assert_eq!(cfg.sim.crash_speed, 5.0);
    }

    #[test]
    fn initial_conditions_fall_back_to_planet() {
        let cfg = ScenarioConfig::from_toml_str(LUNAR).unwrap();
        let sim = cfg.build().unwrap();
        assert_eq!(sim.config().initial_altitude, 1000.0);
        assert_eq!(sim.config().initial_velocity, -20.0);
        assert_eq!(sim.lander().state.altitude(), 1000.0);

        let explicit = ScenarioConfig {
            initial_altitude: Some(250.0),
            ..cfg
        };
        assert_eq!(explicit.build().unwrap().lander().state.altitude(), 250.0);
    }

    #[test]
    fn unknown_controller_kind_is_an_error() {
        let text = LUNAR.replace(r#"kind = "pid""#, r#"kind = "fuzzy""#);
        assert!(matches!(ScenarioConfig::from_toml_str(&text), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_planet_is_an_error() {
        let text = LUNAR.replace(r#"planet = "Moon""#, r#"planet = "Vulcan""#);
        let cfg = ScenarioConfig::from_toml_str(&text).unwrap();
        assert!(matches!(cfg.build(), Err(ConfigError::UnknownPlanet(_))));
    }

    #[test]
    fn initial_conditions_inside_sim_table_rejected() {
        let text = LUNAR.replace("dt = 0.05", "dt = 0.05\ninitial_altitude = 10.0");
        assert!(ScenarioConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn malformed_emergency_rejected_at_build() {
        let text = LUNAR.replace("delay = 0.2", "delay = -1.0");
        let cfg = ScenarioConfig::from_toml_str(&text).unwrap();
        assert!(matches!(cfg.build(), Err(ConfigError::InvalidScenario(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(SimConfig::default().validate().is_ok());
        let bad = SimConfig { dt: 0.0, ..SimConfig::default() };
        assert!(bad.validate().is_err());
        let bad = SimConfig { thrust_direction: Vector3::zeros(), ..SimConfig::default() };
        assert!(bad.validate().is_err());
    }
}
