//! Box-constrained quadratic programs: minimize `1/2 u^T H u + f^T u`
//! subject to `lo <= u_i <= hi`.

use nalgebra::{DMatrix, DVector};

use crate::error::SolverError;

/// Swappable bounded QP strategy.
pub trait BoxQpSolver {
    fn solve(
        &self,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
        lo: f64,
        hi: f64,
        start: &DVector<f64>,
    ) -> Result<DVector<f64>, SolverError>;

    fn name(&self) -> &str;
}

/// Accelerated projected gradient (FISTA) with adaptive restart.
///
/// Step size is `1 / lambda_max(H)`. Converged when the iterate moves less
/// than `tol * (1 + |u|)`.
#[derive(Debug, Clone)]
pub struct ProjectedGradient {
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for ProjectedGradient {
    fn default() -> Self {
        Self { max_iter: 2000, tol: 1e-9 }
    }
}

impl BoxQpSolver for ProjectedGradient {
    fn solve(
        &self,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
        lo: f64,
        hi: f64,
        start: &DVector<f64>,
    ) -> Result<DVector<f64>, SolverError> {
        if h.iter().chain(f.iter()).any(|v| !v.is_finite()) || !(lo <= hi) {
            return Err(SolverError::NonFinite);
        }
        let lipschitz = h.symmetric_eigenvalues().max();
        if !(lipschitz > 0.0 && lipschitz.is_finite()) {
            return Err(SolverError::Singular);
        }
        let step = 1.0 / lipschitz;
        let project = |v: DVector<f64>| v.map(|x| x.clamp(lo, hi));

        let mut u = project(start.clone());
        let mut y = u.clone();
        let mut t = 1.0_f64;

        for _ in 0..self.max_iter {
            let grad = h * &y + f;
            let u_next = project(&y - grad * step);
            let delta = &u_next - &u;
            if delta.norm() <= self.tol * (1.0 + u_next.norm()) {
                return Ok(u_next);
            }

            // Restart momentum when it points against progress
            if (&y - &u_next).dot(&delta) > 0.0 {
                t = 1.0;
                y = u_next.clone();
            } else {
                let t_next = 0.5 * (1.0 + (1.0 + 4.0 * t * t).sqrt());
                y = &u_next + delta * ((t - 1.0) / t_next);
                t = t_next;
            }
            u = u_next;
        }
        Err(SolverError::NotConverged { iterations: self.max_iter })
    }

    fn name(&self) -> &str {
        "projected-gradient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interior_minimum_matches_linear_solve() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let f = DVector::from_vec(vec![1.0, 2.0]);
        let exact = h.clone().lu().solve(&(-&f)).unwrap();

        let u = ProjectedGradient::default()
            .solve(&h, &f, -10.0, 10.0, &DVector::zeros(2))
            .unwrap();
        assert_relative_eq!(u, exact, epsilon = 1e-6);
    }

    #[test]
    fn active_bounds_are_respected() {
        // unconstrained minimum at (1, -4)
        let h = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 2.0]));
        let f = DVector::from_vec(vec![-2.0, 8.0]);
        let u = ProjectedGradient::default()
            .solve(&h, &f, -1.0, 3.0, &DVector::zeros(2))
            .unwrap();
        assert_relative_eq!(u[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(u[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let h = DMatrix::from_element(1, 1, f64::NAN);
        let f = DVector::from_element(1, 0.0);
        let err = ProjectedGradient::default()
            .solve(&h, &f, -1.0, 1.0, &DVector::zeros(1))
            .unwrap_err();
        assert_eq!(err, SolverError::NonFinite);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let h = DMatrix::from_row_slice(2, 2, &[1000.0, 0.0, 0.0, 0.001]);
        let f = DVector::from_vec(vec![1.0, 1.0]);
        let solver = ProjectedGradient { max_iter: 3, tol: 1e-12 };
        assert_eq!(
            solver.solve(&h, &f, -1e6, 1e6, &DVector::zeros(2)).unwrap_err(),
            SolverError::NotConverged { iterations: 3 }
        );
    }
}
