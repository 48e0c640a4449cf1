use nalgebra::{Rotation3, Vector3};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665; // standard gravity for Isp conversion, m/s^2

// ---------------------------------------------------------------------------
// Kinematic state of the vehicle
// ---------------------------------------------------------------------------

/// Rigid-body kinematic state. World frame has +Y up (y = altitude).
///
/// `orientation` holds Euler angles `[roll, pitch, yaw]`, rotations about
/// body x, y and z. `angular_velocity` components are about the same axes.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub position: Vector3<f64>,         // m, world
    pub velocity: Vector3<f64>,         // m/s, world
    pub orientation: Vector3<f64>,      // rad, [roll, pitch, yaw]
    pub angular_velocity: Vector3<f64>, // rad/s
}

impl KinematicState {
    /// At rest, level, at the given altitude with a vertical velocity.
    pub fn at_altitude(altitude: f64, vertical_velocity: f64) -> Self {
        Self {
            position: Vector3::new(0.0, altitude, 0.0),
            velocity: Vector3::new(0.0, vertical_velocity, 0.0),
            orientation: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    pub fn altitude(&self) -> f64 {
        self.position.y
    }

    pub fn vertical_velocity(&self) -> f64 {
        self.velocity.y
    }

    /// Body -> world rotation, R = Rz(yaw) * Ry(pitch) * Rx(roll).
    pub fn body_to_world(&self) -> Rotation3<f64> {
        let o = &self.orientation;
        Rotation3::from_euler_angles(o.x, o.y, o.z)
    }
}

impl Default for KinematicState {
    fn default() -> Self {
        Self::at_altitude(1000.0, 0.0)
    }
}
