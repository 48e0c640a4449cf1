use nalgebra::{Matrix2, RowVector2, Vector2};
use tracing::warn;

use super::config::{check_cost, check_limits, LqrConfig};
use super::riccati::{double_integrator, gain_from_solution, ClosedFormCare, Kleinman, RiccatiSolver};
use crate::error::ConfigError;

/// Gain `[k_pos, k_vel]` used when no Riccati strategy produces a usable solution.
pub const FALLBACK_GAIN: [f64; 2] = [0.0, 60.0];

// ---------------------------------------------------------------------------
// LQR: fixed-gain state feedback on [position error, velocity error]
// ---------------------------------------------------------------------------

/// Infinite-horizon LQR on the double integrator.
///
/// There is no position sensor: position is dead-reckoned from the velocity
/// measurements (`pos_est += v dt`) and regulated to zero while velocity is
/// regulated to the setpoint.
#[derive(Debug, Clone)]
pub struct LqrController {
    pub setpoint: f64,
    gain: RowVector2<f64>,
    output_limits: Option<(f64, f64)>,
    pos_est: f64,
    vel_est: f64,
}

impl LqrController {
    /// Gain from the closed-form CARE solution.
    pub fn new(cfg: &LqrConfig) -> Result<Self, ConfigError> {
        Self::with_solver(cfg, &ClosedFormCare)
    }

    /// Gain from `solver`, falling back to Kleinman iteration, then to
    /// [`FALLBACK_GAIN`].
    pub fn with_solver(cfg: &LqrConfig, solver: &dyn RiccatiSolver) -> Result<Self, ConfigError> {
        check_cost(&cfg.q, cfg.r)?;
        if let Some(limits) = cfg.output_limits {
            check_limits(limits)?;
        }
        if !cfg.setpoint.is_finite() {
            return Err(ConfigError::invalid("setpoint", "must be finite"));
        }

        let q = Matrix2::new(cfg.q[0][0], cfg.q[0][1], cfg.q[1][0], cfg.q[1][1]);
        Ok(Self {
            setpoint: cfg.setpoint,
            gain: compute_gain(solver, &q, cfg.r),
            output_limits: cfg.output_limits,
            pos_est: 0.0,
            vel_est: 0.0,
        })
    }

    pub fn gain(&self) -> RowVector2<f64> {
        self.gain
    }

    pub fn position_estimate(&self) -> f64 {
        self.pos_est
    }

    /// Closed-loop matrix `A - B K`.
    pub fn closed_loop(&self) -> Matrix2<f64> {
        let (a, b) = double_integrator();
        a - b * self.gain
    }

    pub fn update(&mut self, vertical_velocity: f64, dt: f64) -> f64 {
        self.vel_est = vertical_velocity;
        self.pos_est += self.vel_est * dt;

        let x = Vector2::new(self.pos_est, self.vel_est - self.setpoint);
        let u = -(self.gain * x)[0];
        match self.output_limits {
            Some((lo, hi)) => u.clamp(lo, hi),
            None => u,
        }
    }

    pub fn reset(&mut self) {
        self.pos_est = 0.0;
        self.vel_est = 0.0;
    }
}

fn fallback_gain() -> RowVector2<f64> {
    RowVector2::new(FALLBACK_GAIN[0], FALLBACK_GAIN[1])
}

fn compute_gain(solver: &dyn RiccatiSolver, q: &Matrix2<f64>, r: f64) -> RowVector2<f64> {
    let (a, b) = double_integrator();
    let usable = |p: Matrix2<f64>| {
        let k = gain_from_solution(&b, &p, r);
        k.iter().all(|v| v.is_finite()).then_some(k)
    };

    match solver.solve(&a, &b, q, r).map(usable) {
        Ok(Some(k)) => return k,
        Ok(None) => warn!(solver = solver.name(), "CARE solution gave non-finite gain, trying Kleinman iteration"),
        Err(e) => warn!(solver = solver.name(), error = %e, "CARE solver failed, trying Kleinman iteration"),
    }

    match Kleinman::default().solve(&a, &b, q, r).map(usable) {
        Ok(Some(k)) => k,
        Ok(None) => {
            warn!("Kleinman gain non-finite, using fixed fallback gain");
            fallback_gain()
        }
        Err(e) => {
            warn!(error = %e, "Kleinman iteration failed, using fixed fallback gain");
            fallback_gain()
        }
    }
}

impl super::Controller for LqrController {
    fn update(&mut self, vertical_velocity: f64, dt: f64, _altitude: f64) -> f64 {
        LqrController::update(self, vertical_velocity, dt)
    }

    fn reset(&mut self) {
        LqrController::reset(self);
    }

    fn name(&self) -> &str {
        "LQR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use approx::assert_relative_eq;

    struct Broken;

    impl RiccatiSolver for Broken {
        fn solve(
            &self,
            _a: &Matrix2<f64>,
            _b: &Vector2<f64>,
            _q: &Matrix2<f64>,
            _r: f64,
        ) -> Result<Matrix2<f64>, SolverError> {
            Err(SolverError::Unsupported)
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn assert_hurwitz(m: &Matrix2<f64>) {
        // 2x2 is Hurwitz iff trace < 0 and det > 0
        assert!(m.trace() < 0.0, "trace {}", m.trace());
        assert!(m.determinant() > 0.0, "det {}", m.determinant());
        let eig = m.complex_eigenvalues();
        assert!(eig.iter().all(|l| l.re < 0.0), "{:?}", eig);
    }

    #[test]
    fn default_gain_is_stabilizing() {
        let lqr = LqrController::new(&LqrConfig::default()).unwrap();
        assert_hurwitz(&lqr.closed_loop());
    }

    #[test]
    fn kleinman_fallback_gives_same_gain() {
        let exact = LqrController::new(&LqrConfig::default()).unwrap();
        let fallback = LqrController::with_solver(&LqrConfig::default(), &Broken).unwrap();
        assert_relative_eq!(exact.gain(), fallback.gain(), epsilon = 1e-5);
        assert_hurwitz(&fallback.closed_loop());
    }

    #[test]
    fn update_dead_reckons_position() {
        let mut lqr = LqrController::new(&LqrConfig::default()).unwrap();
        let k = lqr.gain();
        let u = lqr.update(-12.0, 0.5);
        assert_relative_eq!(lqr.position_estimate(), -6.0);
        assert_relative_eq!(u, -(k[0] * -6.0 + k[1] * -2.0), epsilon = 1e-12);
        assert!(u > 0.0, "descending faster than setpoint must brake");

        lqr.reset();
        assert_eq!(lqr.position_estimate(), 0.0);
    }

    #[test]
    fn output_limits_clamp() {
        let cfg = LqrConfig { output_limits: Some((-1.0, 1.0)), ..LqrConfig::default() };
        let mut lqr = LqrController::new(&cfg).unwrap();
        assert_eq!(lqr.update(-100.0, 0.1), 1.0);
    }

    #[test]
    fn rejects_non_positive_r() {
        let cfg = LqrConfig { r: 0.0, ..LqrConfig::default() };
        assert!(matches!(
            LqrController::new(&cfg),
            Err(ConfigError::InvalidParameter { name: "r", .. })
        ));
    }
}
