//! Objective function contract consumed by every solver.
//!
//! This module defines the [`ObjectiveFunction`] trait — the single
//! evaluation interface shared by all optimization algorithms in this
//! workspace — together with [`Quadratic`], the canonical smooth test
//! objective `f(x) = ½ xᵀQx + qᵀx`.
//!
//! # Design
//!
//! Starting-point and lower-bound queries are explicit operations
//! (`initial_point`, `f_star`, `x_star`) rather than sentinel evaluations,
//! so the evaluation methods only ever see well-formed points of the
//! declared dimension.
//!
//! Evaluation is infallible by construction: anything that could make it
//! fail (mismatched shapes, a matrix that cannot be factorized) is rejected
//! when the objective is built.

use crate::{
    error::{OptimError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::fmt::Debug;

/// Trait for objective functions over dense real vectors.
///
/// Implementations must be pure: evaluating the same point twice yields the
/// same value, and evaluation does not change the observable problem data.
/// (Implementations may still maintain interior caches, as the Lagrangian
/// relaxation does.)
pub trait ObjectiveFunction<T: Scalar>: Debug {
    /// Number of variables of the objective.
    fn dimension(&self) -> usize;

    /// Evaluates the objective at `x`.
    fn cost(&self, x: &DVector<T>) -> T;

    /// Evaluates the gradient (or a subgradient) at `x`.
    fn gradient(&self, x: &DVector<T>) -> DVector<T>;

    /// Evaluates cost and gradient together.
    ///
    /// Override when the two share intermediate computations.
    fn cost_and_gradient(&self, x: &DVector<T>) -> (T, DVector<T>) {
        (self.cost(x), self.gradient(x))
    }

    /// The canonical starting point for solvers that were not given one.
    fn initial_point(&self) -> DVector<T> {
        DVector::zeros(self.dimension())
    }

    /// The known optimal point, if any.
    fn x_star(&self) -> Option<DVector<T>> {
        None
    }

    /// The best known lower bound on the optimal value.
    ///
    /// Returns negative infinity when no such information is available.
    fn f_star(&self) -> T {
        <T as Float>::neg_infinity()
    }
}

/// Quadratic objective `f(x) = ½ xᵀQx + qᵀx` with symmetric `Q`.
///
/// The coefficient matrix is immutable after construction; the stationary
/// point `x* = -Q⁻¹q` (and its value) is computed once, when `Q` is
/// invertible, and reused by `x_star`/`f_star`.
#[derive(Debug, Clone)]
pub struct Quadratic<T: Scalar> {
    q_matrix: DMatrix<T>,
    q_vector: DVector<T>,
    x_opt: Option<DVector<T>>,
    f_opt: T,
}

impl<T: Scalar> Quadratic<T> {
    /// Creates a new quadratic objective.
    ///
    /// # Errors
    ///
    /// Returns [`OptimError::DimensionMismatch`] when `q` does not match the
    /// order of `hessian`, and [`OptimError::Numerical`] when `hessian` is
    /// not square or not symmetric.
    pub fn new(hessian: DMatrix<T>, q: DVector<T>) -> Result<Self> {
        if !hessian.is_square() {
            return Err(OptimError::numerical("Q is not a square matrix"));
        }
        if hessian.nrows() != q.len() {
            return Err(OptimError::dimension_mismatch(hessian.nrows(), q.len()));
        }
        let tol = <T as Scalar>::from_f64(1e-10);
        for i in 0..hessian.nrows() {
            for j in (i + 1)..hessian.ncols() {
                if <T as Float>::abs(hessian[(i, j)] - hessian[(j, i)]) > tol {
                    return Err(OptimError::numerical("Q is not symmetric"));
                }
            }
        }

        // Stationary point, when Q is invertible. For a convex quadratic this
        // is the unique minimizer.
        let x_opt = hessian.clone().lu().solve(&(-&q));
        let mut quad = Self {
            q_matrix: hessian,
            q_vector: q,
            x_opt: None,
            f_opt: <T as Float>::neg_infinity(),
        };
        if let Some(x) = x_opt {
            quad.f_opt = quad.cost(&x);
            quad.x_opt = Some(x);
        }
        Ok(quad)
    }

    /// Creates the simple quadratic `f(x) = ½‖x‖²`.
    pub fn simple(dim: usize) -> Self {
        Self::new(DMatrix::identity(dim, dim), DVector::zeros(dim))
            .expect("identity quadratic is always valid")
    }

    /// The coefficient matrix `Q`.
    pub fn q_matrix(&self) -> &DMatrix<T> {
        &self.q_matrix
    }

    /// The linear term `q`.
    pub fn q_vector(&self) -> &DVector<T> {
        &self.q_vector
    }
}

impl<T: Scalar> ObjectiveFunction<T> for Quadratic<T> {
    fn dimension(&self) -> usize {
        self.q_vector.len()
    }

    fn cost(&self, x: &DVector<T>) -> T {
        let qx = &self.q_matrix * x;
        <T as Scalar>::from_f64(0.5) * x.dot(&qx) + self.q_vector.dot(x)
    }

    fn gradient(&self, x: &DVector<T>) -> DVector<T> {
        &self.q_matrix * x + &self.q_vector
    }

    fn x_star(&self) -> Option<DVector<T>> {
        self.x_opt.clone()
    }

    fn f_star(&self) -> T {
        self.f_opt
    }
}
