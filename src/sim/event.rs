use std::fmt;

use nalgebra::Vector3;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Flight phase and touchdown outcome
// ---------------------------------------------------------------------------

/// Simulator lifecycle: `Fresh` after construction or reset, `Running` once
/// stepped, `Landed` when altitude first reaches zero. `Landed` is terminal
/// until the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    #[default]
    Fresh,
    Running,
    Landed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingOutcome {
    Landed,
    Crashed,
}

impl LandingOutcome {
    /// Crashed when the touchdown speed exceeds `crash_speed`.
    pub fn classify(velocity: &Vector3<f64>, crash_speed: f64) -> Self {
        if velocity.norm() > crash_speed {
            LandingOutcome::Crashed
        } else {
            LandingOutcome::Landed
        }
    }
}

impl fmt::Display for LandingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandingOutcome::Landed => f.write_str("landed safely"),
            LandingOutcome::Crashed => f.write_str("crashed"),
        }
    }
}

/// Conditions at the first step that reached the ground.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Touchdown {
    pub time: f64,
    pub velocity: Vector3<f64>,
    pub speed: f64,
    pub fuel_remaining: f64,
    pub outcome: LandingOutcome,
}

impl Touchdown {
    pub fn new(time: f64, velocity: Vector3<f64>, fuel_remaining: f64, crash_speed: f64) -> Self {
        Self {
            time,
            velocity,
            speed: velocity.norm(),
            fuel_remaining,
            outcome: LandingOutcome::classify(&velocity, crash_speed),
        }
    }
}
