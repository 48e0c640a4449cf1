//! Continuous-time algebraic Riccati equation (CARE) solvers for the
//! two-state vertical model.
//!
//! `A^T P + P A - P B R^-1 B^T P + Q = 0`

use nalgebra::{Matrix2, Matrix4, RowVector2, Vector2, Vector4};

use crate::error::SolverError;

/// Swappable CARE strategy. Returns the stabilizing solution `P`.
pub trait RiccatiSolver {
    fn solve(
        &self,
        a: &Matrix2<f64>,
        b: &Vector2<f64>,
        q: &Matrix2<f64>,
        r: f64,
    ) -> Result<Matrix2<f64>, SolverError>;

    fn name(&self) -> &str;
}

/// `K = R^-1 B^T P`
pub fn gain_from_solution(b: &Vector2<f64>, p: &Matrix2<f64>, r: f64) -> RowVector2<f64> {
    b.transpose() * p / r
}

/// Continuous double integrator: `A = [[0, 1], [0, 0]]`, `B = [0, 1]^T`.
pub fn double_integrator() -> (Matrix2<f64>, Vector2<f64>) {
    (Matrix2::new(0.0, 1.0, 0.0, 0.0), Vector2::new(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Closed form for the double integrator
// ---------------------------------------------------------------------------

/// Exact CARE solution for the double integrator.
///
/// With `P = [[p1, p2], [p2, p3]]` the equation reduces to
/// `p2 = sqrt(r q11)`, `p3 = sqrt(r (q22 + 2 p2))`, `p1 = p2 p3 / r - q12`.
/// Any other (A, B) pair is `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedFormCare;

impl RiccatiSolver for ClosedFormCare {
    fn solve(
        &self,
        a: &Matrix2<f64>,
        b: &Vector2<f64>,
        q: &Matrix2<f64>,
        r: f64,
    ) -> Result<Matrix2<f64>, SolverError> {
        let (a_di, b_di) = double_integrator();
        if *a != a_di || *b != b_di {
            return Err(SolverError::Unsupported);
        }
        let q12 = 0.5 * (q[(0, 1)] + q[(1, 0)]);
        let p2 = (r * q[(0, 0)]).sqrt();
        let p3 = (r * (q[(1, 1)] + 2.0 * p2)).sqrt();
        let p1 = p2 * p3 / r - q12;

        let p = Matrix2::new(p1, p2, p2, p3);
        if p.iter().all(|v| v.is_finite()) {
            Ok(p)
        } else {
            Err(SolverError::NonFinite)
        }
    }

    fn name(&self) -> &str {
        "closed-form"
    }
}

// ---------------------------------------------------------------------------
// Kleinman iteration
// ---------------------------------------------------------------------------

/// Newton-Kleinman iteration: repeatedly solve the closed-loop Lyapunov
/// equation `Acl^T P + P Acl = -(Q + K^T R K)` through its Kronecker form,
/// then set `K = R^-1 B^T P`, until `|dK| < tol`.
///
/// The seed gain must stabilize `A - B K`; the default `[1, 2]` places a
/// double pole at -1 for the double integrator.
#[derive(Debug, Clone)]
pub struct Kleinman {
    pub initial_gain: RowVector2<f64>,
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for Kleinman {
    fn default() -> Self {
        Self {
            initial_gain: RowVector2::new(1.0, 2.0),
            tol: 1e-6,
            max_iter: 200,
        }
    }
}

impl RiccatiSolver for Kleinman {
    fn solve(
        &self,
        a: &Matrix2<f64>,
        b: &Vector2<f64>,
        q: &Matrix2<f64>,
        r: f64,
    ) -> Result<Matrix2<f64>, SolverError> {
        let eye = Matrix2::<f64>::identity();
        let mut k = self.initial_gain;

        for _ in 0..self.max_iter {
            let acl = a - b * k;
            let s = q + k.transpose() * r * k;

            let m: Matrix4<f64> = eye.kronecker(&acl.transpose()) + acl.transpose().kronecker(&eye);
            let rhs = -Vector4::from_column_slice(s.as_slice());
            let vec_p = m.lu().solve(&rhs).ok_or(SolverError::Singular)?;

            let p = Matrix2::from_column_slice(vec_p.as_slice());
            let p = 0.5 * (p + p.transpose());
            let k_new = gain_from_solution(b, &p, r);
            if !k_new.iter().all(|v| v.is_finite()) {
                return Err(SolverError::NonFinite);
            }
            if (k_new - k).norm() < self.tol {
                return Ok(p);
            }
            k = k_new;
        }
        Err(SolverError::NotConverged { iterations: self.max_iter })
    }

    fn name(&self) -> &str {
        "kleinman"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_cost() -> (Matrix2<f64>, f64) {
        (Matrix2::new(0.01, 0.0, 0.0, 200.0), 1.0)
    }

    fn care_residual(p: &Matrix2<f64>, q: &Matrix2<f64>, r: f64) -> f64 {
        let (a, b) = double_integrator();
        (a.transpose() * p + p * a - p * b * b.transpose() * p / r + q).norm()
    }

    #[test]
    fn closed_form_satisfies_care() {
        let (q, r) = default_cost();
        let p = ClosedFormCare.solve(&double_integrator().0, &double_integrator().1, &q, r).unwrap();
        assert!(care_residual(&p, &q, r) < 1e-9);
        let k = gain_from_solution(&double_integrator().1, &p, r);
        assert_relative_eq!(k[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(k[1], 200.2_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn closed_form_rejects_other_systems() {
        let (q, r) = default_cost();
        let a = Matrix2::new(0.0, 1.0, -1.0, 0.0);
        let err = ClosedFormCare.solve(&a, &Vector2::new(0.0, 1.0), &q, r).unwrap_err();
        assert_eq!(err, SolverError::Unsupported);
    }

    #[test]
    fn kleinman_matches_closed_form() {
        let (a, b) = double_integrator();
        for (q, r) in [default_cost(), (Matrix2::new(1.0, 0.0, 0.0, 1.0), 0.5)] {
            let exact = ClosedFormCare.solve(&a, &b, &q, r).unwrap();
            let iter = Kleinman::default().solve(&a, &b, &q, r).unwrap();
            assert_relative_eq!(
                gain_from_solution(&b, &iter, r),
                gain_from_solution(&b, &exact, r),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn kleinman_from_zero_gain_is_singular() {
        let (a, b) = double_integrator();
        let (q, r) = default_cost();
        let solver = Kleinman { initial_gain: RowVector2::zeros(), ..Kleinman::default() };
        assert_eq!(solver.solve(&a, &b, &q, r).unwrap_err(), SolverError::Singular);
    }

    #[test]
    fn kleinman_reports_iteration_cap() {
        let (a, b) = double_integrator();
        let (q, r) = default_cost();
        let solver = Kleinman { max_iter: 1, ..Kleinman::default() };
        assert_eq!(
            solver.solve(&a, &b, &q, r).unwrap_err(),
            SolverError::NotConverged { iterations: 1 }
        );
    }
}
