use nalgebra::{DMatrix, DVector, Vector3};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::vehicle::Engine;

/// Residual norm (N, N*m) above which unmet demand is redistributed.
const RESIDUAL_TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Thrust allocation: desired wrench -> per-engine thrust magnitudes
// ---------------------------------------------------------------------------

/// Least-squares allocator over a fixed engine geometry.
///
/// The 6 x n design matrix stacks each engine's unit direction over its
/// moment arm `r x d`. Its pseudo-inverse is computed once, giving the
/// minimum-norm solution when n > 6 and the best fit when n < 6.
///
/// Engines whose solution leaves `[0, capacity_i]` are pinned to the violated
/// bound (a disabled engine has zero capacity) and the rest are re-solved
/// against the wrench still owed. If that leaves demand unmet, the residual force is
/// projected on the desired-force direction f. That demand is spread over
/// engines in proportion to `spare_capacity_i * max(0, d_i . f)`, scaled so
/// the delivered projection equals the demand, then clipped again. This
/// repeats while demand and aligned spare capacity remain (at most n passes).
/// Engines opposing f never receive residual, and torque balance is not
/// restored during redistribution; that is the allocation error under
/// saturation.
#[derive(Debug, Clone)]
pub struct ThrustAllocator {
    design: DMatrix<f64>,
    pseudo_inverse: DMatrix<f64>,
    directions: Vec<Vector3<f64>>,
}

impl ThrustAllocator {
    pub fn new(engines: &[Engine]) -> Result<Self, ConfigError> {
        if engines.is_empty() {
            return Err(ConfigError::NoEngines);
        }
        let n = engines.len();
        let mut design = DMatrix::zeros(6, n);
        for (i, engine) in engines.iter().enumerate() {
            design.fixed_view_mut::<3, 1>(0, i).copy_from(engine.direction());
            design.fixed_view_mut::<3, 1>(3, i).copy_from(&engine.moment_arm());
        }
        let pseudo_inverse = design
            .clone()
            .pseudo_inverse(1e-12)
            .map_err(ConfigError::DegenerateGeometry)?;

        Ok(Self {
            design,
            pseudo_inverse,
            directions: engines.iter().map(|e| *e.direction()).collect(),
        })
    }

    pub fn engine_count(&self) -> usize {
        self.directions.len()
    }

    /// Per-engine thrust (N), each in `[0, available_thrust]`.
    pub fn allocate(
        &self,
        engines: &[Engine],
        desired_force: &Vector3<f64>,
        desired_torque: &Vector3<f64>,
    ) -> Vec<f64> {
        let n = self.engine_count();
        if engines.len() != n {
            warn!(expected = n, got = engines.len(), "engine set changed since allocator was built");
            return vec![0.0; engines.len()];
        }

        let b = DVector::from_iterator(
            6,
            desired_force.iter().chain(desired_torque.iter()).copied(),
        );
        let caps: Vec<f64> = engines.iter().map(Engine::available_thrust).collect();

        let mut x = self.solve_bounded(&b, &caps);

        let residual = &b - &self.design * DVector::from_column_slice(&x);
        if residual.norm() > RESIDUAL_TOL {
            self.redistribute(&mut x, &caps, desired_force);
        }

        clip(&mut x, &caps);
        x
    }

    /// Net force and torque (body frame) produced by the given thrusts.
    pub fn wrench(&self, thrusts: &[f64]) -> (Vector3<f64>, Vector3<f64>) {
        let w = &self.design * DVector::from_column_slice(thrusts);
        (
            Vector3::new(w[0], w[1], w[2]),
            Vector3::new(w[3], w[4], w[5]),
        )
    }

    /// Minimum-norm solution with bound violators pinned. Engines whose
    /// solution leaves `[0, capacity]` are fixed at the violated bound and the
    /// wrench left over is re-solved over the remaining engines, until every
    /// free engine is feasible.
    fn solve_bounded(&self, b: &DVector<f64>, caps: &[f64]) -> Vec<f64> {
        let mut x: Vec<f64> = (&self.pseudo_inverse * b).iter().copied().collect();
        let mut free: Vec<usize> = (0..x.len()).collect();

        for _ in 0..x.len() {
            let violated: Vec<usize> = free
                .iter()
                .copied()
                .filter(|&i| !(x[i].is_finite() && (0.0..=caps[i]).contains(&x[i])))
                .collect();
            if violated.is_empty() {
                break;
            }
            clip(&mut x, caps);
            free.retain(|i| !violated.contains(i));
            if free.is_empty() {
                break;
            }

            let mut rhs = b.clone();
            for (i, xi) in x.iter().enumerate() {
                if !free.contains(&i) {
                    rhs -= self.design.column(i) * *xi;
                }
            }
            let Ok(sub_inverse) = self.design.select_columns(free.iter()).pseudo_inverse(1e-12) else {
                break;
            };
            let sub = sub_inverse * rhs;
            for (k, &i) in free.iter().enumerate() {
                x[i] = sub[k];
            }
        }

        clip(&mut x, caps);
        x
    }

    fn delivered_force(&self, thrusts: &[f64]) -> Vector3<f64> {
        self.directions
            .iter()
            .zip(thrusts)
            .map(|(d, t)| d * *t)
            .sum()
    }

    fn redistribute(&self, x: &mut [f64], caps: &[f64], desired_force: &Vector3<f64>) {
        let f_norm = desired_force.norm();
        if f_norm <= 1e-12 {
            return;
        }
        let f_hat = desired_force / f_norm;
        let align: Vec<f64> = self.directions.iter().map(|d| d.dot(&f_hat).max(0.0)).collect();

        for _ in 0..x.len() {
            let demand = (desired_force - self.delivered_force(x)).dot(&f_hat);
            if demand <= RESIDUAL_TOL {
                return;
            }

            let weights: Vec<f64> = x
                .iter()
                .zip(caps)
                .zip(&align)
                .map(|((xi, cap), a)| (cap - xi).max(0.0) * a)
                .collect();
            let effective: f64 = weights.iter().zip(&align).map(|(w, a)| w * a).sum();
            if effective <= 1e-12 {
                debug!(demand, "allocator saturated, residual demand left unmet");
                return;
            }

            let scale = demand / effective;
            for ((xi, w), cap) in x.iter_mut().zip(&weights).zip(caps) {
                *xi = (*xi + scale * w).min(*cap);
            }
        }
    }
}

fn clip(x: &mut [f64], caps: &[f64]) {
    for (xi, cap) in x.iter_mut().zip(caps) {
        *xi = if xi.is_finite() { xi.clamp(0.0, *cap) } else { 0.0 };
    }
}
