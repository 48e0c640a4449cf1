use nalgebra::Vector3;

use crate::physics::aerodynamics;
use crate::physics::Planet;
use crate::vehicle::Lander;

/// Forces and moment applied during one integration step (world frame).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedForces {
    pub thrust: Vector3<f64>,
    pub drag: Vector3<f64>,
    pub weight: Vector3<f64>,
    pub torque: Vector3<f64>,
}

impl AppliedForces {
    pub fn net(&self) -> Vector3<f64> {
        self.thrust + self.drag + self.weight
    }
}

// ---------------------------------------------------------------------------
// Semi-implicit Euler step
// ---------------------------------------------------------------------------

/// Advance the lander state by `dt`, mutating it in place.
///
/// Forces:
///   1. Weight, from gravity at the current altitude
///   2. Thrust along `thrust_direction` (body frame), rotated to world
///   3. Quadratic drag per axis, relative to the wind
///
/// Rotation is driven only by the drag moment `half_dims x drag` through the
/// diagonal inertia; axes are treated as decoupled. Velocity is updated
/// before position (and angular rate before attitude).
pub fn step(
    lander: &mut Lander,
    planet: &Planet,
    thrust_direction: &Vector3<f64>,
    thrust_magnitude: f64,
    dt: f64,
    wind: &Vector3<f64>,
) -> AppliedForces {
    let altitude = lander.state.altitude();
    let g = planet.gravity_at_height(altitude);
    let rho = planet.density_at_height(altitude);
    let mass = lander.mass();

    // --- Linear ---
    let weight = Vector3::new(0.0, -mass * g, 0.0);

    let dir_norm = thrust_direction.norm();
    let dir_body = if dir_norm > 1e-12 {
        thrust_direction / dir_norm
    } else {
        *thrust_direction
    };
    let thrust = lander.state.body_to_world() * dir_body * thrust_magnitude;

    let drag = aerodynamics::drag_force(&lander.state.velocity, wind, rho, lander.drag_coefficient);

    let accel = (thrust + drag + weight) / mass;
    lander.state.velocity += accel * dt;
    lander.state.position += lander.state.velocity * dt;

    // --- Rotational ---
    let torque = aerodynamics::drag_torque(&lander.dimensions, &drag);
    let alpha = torque.component_div(&lander.inertia());
    lander.state.angular_velocity += alpha * dt;
    lander.state.orientation += lander.state.angular_velocity * dt;

    AppliedForces { thrust, drag, weight, torque }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
