use super::config::ControllerConfig;
use super::{LqrController, MpcController, Pid};
use crate::error::ConfigError;

/// Trait for vertical guidance laws.
///
/// Implement this to plug a custom guidance law into the simulator.
/// `update` receives the measured vertical velocity and returns the desired
/// vertical acceleration (m/s^2, positive up).
pub trait Controller {
    /// Compute the desired vertical acceleration.
    fn update(&mut self, vertical_velocity: f64, dt: f64, altitude: f64) -> f64;

    /// Reset internal state (integrators, position estimates).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Build the controller described by `config`.
pub fn build_controller(config: &ControllerConfig) -> Result<Box<dyn Controller>, ConfigError> {
    Ok(match config {
        ControllerConfig::Pid(c) => Box::new(Pid::from_config(c)?),
        ControllerConfig::Lqr(c) => Box::new(LqrController::new(c)?),
        ControllerConfig::Mpc(c) => Box::new(MpcController::new(c)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::config::{ControllerKind, PidConfig};

    #[test]
    fn factory_builds_every_kind() {
        for kind in ControllerKind::ALL {
            let c = build_controller(&ControllerConfig::defaults(kind)).unwrap();
            assert_eq!(c.name(), kind.as_str().to_uppercase());
        }
    }

    #[test]
    fn factory_rejects_bad_parameters() {
        let cfg = ControllerConfig::Pid(PidConfig {
            output_limits: Some((5.0, -5.0)),
            ..PidConfig::default()
        });
        assert!(build_controller(&cfg).is_err());
    }
}
