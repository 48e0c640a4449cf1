use nalgebra::Vector3;
use serde::Serialize;

use super::event::FlightPhase;

/// Mass, fuel and per-engine figures for display collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryExtras {
    pub total_mass: f64,
    pub dry_mass: f64,
    pub fuel_mass: f64,
    pub max_fuel_mass: f64,
    pub fuel_consumption_rate: f64,
    pub fuel_percentage: f64,
    pub engine_thrust: Vec<f64>,
    pub engine_enabled: Vec<bool>,
    pub engine_max_thrust: Vec<f64>,
}

/// Snapshot produced by every simulator step. Owns all its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub time: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    /// [roll, pitch, yaw], rad
    pub orientation: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Total thrust applied this step, N.
    pub thrust: f64,
    /// Guidance output this step, if a controller is bound.
    pub desired_acceleration: Option<f64>,
    pub phase: FlightPhase,
    pub extras: TelemetryExtras,
}

impl Telemetry {
    pub fn altitude(&self) -> f64 {
        self.position.y
    }

    pub fn vertical_velocity(&self) -> f64 {
        self.velocity.y
    }
}
