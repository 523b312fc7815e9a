//! Master-problem solver seam for the proximal bundle method.
//!
//! Each bundle iteration solves the stabilized cutting-plane model
//!
//! ```text
//! minimize    v + mu·‖d‖²/2
//! subject to  v ≥ bᵢ + gᵢ·(x + d)        for every bundle piece i
//! ```
//!
//! over `(d, v)`. The bundle method only builds this data and interprets the
//! result; the solve itself is behind the [`MasterSolver`] trait so any
//! conforming quadratic-program backend can be plugged in.
//!
//! [`SimplexDualSolver`] is the default backend. It solves the model's dual,
//! a quadratic program over the unit simplex,
//!
//! ```text
//! minimize over θ ∈ Δ:   (1/2mu)·θᵀGGᵀθ − cᵀθ,      cᵢ = bᵢ + gᵢ·x
//! ```
//!
//! by projected gradient with a Lipschitz step, then recovers
//! `d = −(1/mu)·Gᵀθ` and the model value `v = maxᵢ (cᵢ + gᵢ·d)`.

use crate::bundle::Cut;
use descentopt_core::{
    error::{OptimError, Result},
    linalg::project_simplex,
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::fmt::Debug;

/// Solution of one master problem.
#[derive(Debug, Clone)]
pub struct MasterSolution<T: Scalar> {
    /// Step `d` from the current stability center.
    pub direction: DVector<T>,
    /// Model value `v` at the step, a lower estimate of `f(x + d)`.
    pub model_value: T,
}

/// Contract of the quadratic-program backend used by the bundle method.
///
/// Implementations receive the bundle pieces in affine form together with
/// the stability center `x` and the stabilization weight `mu`, and return
/// either a solution or an error; the bundle method maps errors to its
/// terminal `error` status.
pub trait MasterSolver<T: Scalar>: Debug {
    /// Solves the stabilized master problem over the given pieces.
    fn solve(&self, cuts: &[Cut<T>], x: &DVector<T>, mu: T) -> Result<MasterSolution<T>>;
}

/// Default master backend: projected gradient on the simplex dual.
#[derive(Debug, Clone, Copy)]
pub struct SimplexDualSolver {
    /// Inner iteration cap.
    pub max_iterations: usize,
    /// Relative tolerance on the dual iterate change.
    pub tolerance: f64,
}

impl Default for SimplexDualSolver {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-12,
        }
    }
}

impl SimplexDualSolver {
    /// Creates the solver with default settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Scalar> MasterSolver<T> for SimplexDualSolver {
    fn solve(&self, cuts: &[Cut<T>], x: &DVector<T>, mu: T) -> Result<MasterSolution<T>> {
        let k = cuts.len();
        let n = x.len();
        if k == 0 {
            return Err(OptimError::numerical("master problem has no pieces"));
        }

        // Linearization values cᵢ = bᵢ + gᵢ·x and the Gram matrix GGᵀ.
        let c = DVector::from_fn(k, |i, _| cuts[i].value_at(x));
        let gram = DMatrix::from_fn(k, k, |i, j| cuts[i].gradient().dot(cuts[j].gradient()));
        if c.iter().any(|v| !<T as Float>::is_finite(*v))
            || gram.iter().any(|v| !<T as Float>::is_finite(*v))
        {
            return Err(OptimError::numerical("master problem data is not finite"));
        }

        let trace = gram.diagonal().sum();
        let theta = if trace <= <T as Scalar>::from_f64(1e-30) {
            // Every subgradient is (numerically) zero: the dual is linear,
            // so all mass goes on the best piece.
            let mut best = 0;
            for i in 1..k {
                if c[i] > c[best] {
                    best = i;
                }
            }
            let mut theta = DVector::zeros(k);
            theta[best] = T::one();
            theta
        } else {
            // Projected gradient with the safe step mu/tr(GGᵀ) ≤ 1/L.
            let step = mu / trace;
            let tol = <T as Scalar>::from_f64(self.tolerance);
            let mut theta = DVector::from_element(k, T::one() / <T as Scalar>::from_usize(k));
            for _ in 0..self.max_iterations {
                let grad = &gram * &theta / mu - &c;
                let next = project_simplex(&(&theta - grad * step));
                let change = (&next - &theta).norm();
                theta = next;
                if change <= tol * (T::one() + theta.norm()) {
                    break;
                }
            }
            theta
        };

        // Recover the primal step and the model value it certifies.
        let mut direction = DVector::zeros(n);
        for (i, cut) in cuts.iter().enumerate() {
            direction += cut.gradient() * theta[i];
        }
        direction /= -mu;

        let mut model_value = <T as Float>::neg_infinity();
        for (i, cut) in cuts.iter().enumerate() {
            let piece = c[i] + cut.gradient().dot(&direction);
            model_value = <T as Float>::max(model_value, piece);
        }

        Ok(MasterSolution {
            direction,
            model_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_piece_is_a_subgradient_step() {
        // One cut: the master step is -(1/mu)·g.
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let g = DVector::from_vec(vec![0.5, -1.0]);
        let cut = Cut::new(g.clone(), 3.0, &x);
        let solver = SimplexDualSolver::new();

        let sol = MasterSolver::<f64>::solve(&solver, &[cut], &x, 2.0).unwrap();
        assert_relative_eq!(sol.direction, -&g / 2.0, epsilon = 1e-9);
        // v is the piece value at x + d.
        assert_relative_eq!(sol.model_value, 3.0 + g.dot(&sol.direction), epsilon = 1e-9);
    }

    #[test]
    fn test_opposed_pieces_cancel() {
        // Cuts of |t| at t = ±1: the model minimum sits at d with x + d = 0.
        let x = DVector::from_vec(vec![1.0]);
        let up = Cut::new(DVector::from_vec(vec![1.0]), 1.0, &x);
        let down = Cut::new(
            DVector::from_vec(vec![-1.0]),
            1.0,
            &DVector::from_vec(vec![-1.0]),
        );
        let solver = SimplexDualSolver::new();

        let sol = MasterSolver::<f64>::solve(&solver, &[up, down], &x, 1.0).unwrap();
        // minimize max(1+d, -1-d+... ) + d²/2 — the kink at x+d = 0 wins.
        assert_relative_eq!(sol.direction[0], -1.0, epsilon = 1e-6);
        assert_relative_eq!(sol.model_value, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_gradients_select_best_intercept() {
        let x = DVector::from_vec(vec![0.0]);
        let low = Cut::new(DVector::zeros(1), -5.0, &x);
        let high = Cut::new(DVector::zeros(1), -1.0, &x);
        let solver = SimplexDualSolver::new();

        let sol = MasterSolver::<f64>::solve(&solver, &[low, high], &x, 1.0).unwrap();
        assert_relative_eq!(sol.direction[0], 0.0);
        assert_relative_eq!(sol.model_value, -1.0);
    }

    #[test]
    fn test_empty_bundle_is_an_error() {
        let solver = SimplexDualSolver::new();
        assert!(MasterSolver::<f64>::solve(&solver, &[], &DVector::zeros(1), 1.0).is_err());
    }
}
