use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use tracing::warn;

use super::config::{check_cost, check_limits, MpcConfig};
use super::qp::{BoxQpSolver, ProjectedGradient};
use crate::error::{ConfigError, SolverError};

const FALLBACK_KP: f64 = 0.1;
const FALLBACK_KD: f64 = 0.6;
const TERMINAL_WEIGHT: f64 = 2.0;

// ---------------------------------------------------------------------------
// Receding-horizon controller
// ---------------------------------------------------------------------------

/// MPC on the discretized double integrator with gravity as a known
/// disturbance:
///
/// ```text
/// x[k+1] = A x[k] + B u[k] + d,  A = [[1, dt], [0, 1]],  B = [dt^2/2, dt],  d = -g B
/// ```
///
/// Each update minimizes `sum (x[k] - ref)' Q (x[k] - ref) + R u[k]^2` over the
/// horizon, terminal state weighted double, with `u` boxed by the output
/// limits. The sequence is condensed into a dense QP over `u` and handed to
/// a [`BoxQpSolver`]. Only the first control is returned. A solver failure
/// falls back to a fixed PD law on the same state.
pub struct MpcController {
    pub setpoint: f64,
    horizon: usize,
    q: Matrix2<f64>,
    r: f64,
    u_min: f64,
    u_max: f64,
    dt_nom: f64,
    gravity: f64,
    pos_est: f64,
    vel_est: f64,
    solver: Box<dyn BoxQpSolver>,
}

impl MpcController {
    pub fn new(cfg: &MpcConfig) -> Result<Self, ConfigError> {
        Self::with_solver(cfg, Box::new(ProjectedGradient::default()))
    }

    pub fn with_solver(cfg: &MpcConfig, solver: Box<dyn BoxQpSolver>) -> Result<Self, ConfigError> {
        if cfg.horizon == 0 {
            return Err(ConfigError::invalid("horizon", "must be at least 1"));
        }
        check_cost(&cfg.q, cfg.r)?;
        check_limits(cfg.output_limits)?;
        if !(cfg.dt_nom > 0.0 && cfg.dt_nom.is_finite()) {
            return Err(ConfigError::invalid("dt_nom", format!("must be > 0, got {}", cfg.dt_nom)));
        }
        if !(cfg.gravity.is_finite() && cfg.setpoint.is_finite()) {
            return Err(ConfigError::invalid("gravity/setpoint", "must be finite"));
        }

        // symmetric part; the cost only sees x' Q x
        let q = Matrix2::new(cfg.q[0][0], cfg.q[0][1], cfg.q[1][0], cfg.q[1][1]);
        let q = 0.5 * (q + q.transpose());

        Ok(Self {
            setpoint: cfg.setpoint,
            horizon: cfg.horizon,
            q,
            r: cfg.r,
            u_min: cfg.output_limits.0,
            u_max: cfg.output_limits.1,
            dt_nom: cfg.dt_nom,
            gravity: cfg.gravity,
            pos_est: 0.0,
            vel_est: 0.0,
            solver,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn state_estimate(&self) -> Vector2<f64> {
        Vector2::new(self.pos_est, self.vel_est)
    }

    fn reference(&self) -> Vector2<f64> {
        Vector2::new(0.0, self.setpoint)
    }

    /// Zero-order-hold model `(A, B, d)` for step `dt`.
    fn discretize(&self, dt: f64) -> (Matrix2<f64>, Vector2<f64>, Vector2<f64>) {
        let dt = if (dt - self.dt_nom).abs() > 1e-6 { dt } else { self.dt_nom };
        let b = Vector2::new(0.5 * dt * dt, dt);
        (Matrix2::new(1.0, dt, 0.0, 1.0), b, -self.gravity * b)
    }

    /// Condensed QP `1/2 u' H u + f' u` for the horizon starting at `x0`.
    ///
    /// `x[k] = a[k] + G[k] u` where `a[k]` is the free response and column
    /// `j < k` of `G[k]` is `A^(k-1-j) B`.
    fn condense(&self, x0: &Vector2<f64>, dt: f64) -> (DMatrix<f64>, DVector<f64>) {
        let n = self.horizon;
        let (a, b, d) = self.discretize(dt);
        let reference = self.reference();

        let mut h = DMatrix::from_diagonal_element(n, n, 2.0 * self.r);
        let mut f = DVector::zeros(n);
        let mut free = *x0;
        let mut cols = vec![Vector2::zeros(); n];

        for k in 1..=n {
            free = a * free + d;
            for c in cols.iter_mut().take(k - 1) {
                *c = a * *c;
            }
            cols[k - 1] = b;

            let w = if k == n { TERMINAL_WEIGHT } else { 1.0 };
            let err = free - reference;
            for i in 0..k {
                let qi = self.q * cols[i];
                f[i] += 2.0 * w * qi.dot(&err);
                for j in 0..k {
                    h[(i, j)] += 2.0 * w * cols[j].dot(&qi);
                }
            }
        }
        (h, f)
    }

    fn optimize(&self, x0: &Vector2<f64>, dt: f64) -> Result<f64, SolverError> {
        let (h, f) = self.condense(x0, dt);
        let start = DVector::zeros(self.horizon);
        let u = self.solver.solve(&h, &f, self.u_min, self.u_max, &start)?;
        let first = u[0];
        if first.is_finite() {
            Ok(first.clamp(self.u_min, self.u_max))
        } else {
            Err(SolverError::NonFinite)
        }
    }

    /// Fixed-gain PD on the same state, clamped to the control box.
    pub fn fallback_control(&self, x0: &Vector2<f64>) -> f64 {
        let err = x0 - self.reference();
        (-FALLBACK_KP * err.x - FALLBACK_KD * err.y).clamp(self.u_min, self.u_max)
    }

    pub fn update(&mut self, vertical_velocity: f64, dt: f64) -> f64 {
        let dt = if dt > 0.0 { dt } else { 1e-6 };
        self.vel_est = vertical_velocity;
        self.pos_est += self.vel_est * dt;

        let x0 = self.state_estimate();
        match self.optimize(&x0, dt) {
            Ok(u) => u,
            Err(e) => {
                warn!(solver = self.solver.name(), error = %e, "MPC solve failed, using PD fallback");
                self.fallback_control(&x0)
            }
        }
    }

    pub fn reset(&mut self) {
        self.pos_est = 0.0;
        self.vel_est = 0.0;
    }
}

impl super::Controller for MpcController {
    fn update(&mut self, vertical_velocity: f64, dt: f64, _altitude: f64) -> f64 {
        MpcController::update(self, vertical_velocity, dt)
    }

    fn reset(&mut self) {
        MpcController::reset(self);
    }

    fn name(&self) -> &str {
        "MPC"
    }
}
