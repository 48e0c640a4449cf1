use nalgebra::Vector3;

/// Quadratic drag, componentwise and sign-preserving:
/// F_i = -0.5 * rho * Cd * v_i^2 * sign(v_i), with v taken relative to the wind.
pub fn drag_force(
    velocity: &Vector3<f64>,
    wind: &Vector3<f64>,
    density: f64,
    cd: f64,
) -> Vector3<f64> {
    let rel = velocity - wind;
    rel.map(|v| -0.5 * density * cd * v * v.abs())
}

/// Simplified drag-induced moment about the centre of mass: half_dims x drag.
pub fn drag_torque(dimensions: &Vector3<f64>, drag: &Vector3<f64>) -> Vector3<f64> {
    (dimensions * 0.5).cross(drag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drag_opposes_each_velocity_component() {
        let v = Vector3::new(3.0, -20.0, 0.0);
        let f = drag_force(&v, &Vector3::zeros(), 1.225, 0.8);
        assert!(f.x < 0.0);
        assert!(f.y > 0.0, "Falling body gets upward drag");
        assert_relative_eq!(f.z, 0.0);
        assert_relative_eq!(f.y, 0.5 * 1.225 * 0.8 * 400.0);
    }

    #[test]
    fn wind_matching_velocity_gives_no_drag() {
        let v = Vector3::new(5.0, 0.0, -2.0);
        let f = drag_force(&v, &v, 1.225, 0.8);
        assert!(f.norm() < 1e-12);
    }

    #[test]
    fn vacuum_has_no_drag() {
        let f = drag_force(&Vector3::new(0.0, -300.0, 0.0), &Vector3::zeros(), 0.0, 0.8);
        assert!(f.norm() < 1e-12);
    }

    #[test]
    fn vertical_drag_torque_acts_about_x_and_z() {
        let dims = Vector3::new(2.0, 4.0, 6.0);
        let drag = Vector3::new(0.0, 10.0, 0.0);
        let t = drag_torque(&dims, &drag);
        assert_relative_eq!(t.x, -30.0);
        assert_relative_eq!(t.y, 0.0);
        assert_relative_eq!(t.z, 10.0);
    }
}
