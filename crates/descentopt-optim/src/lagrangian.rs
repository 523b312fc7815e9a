//! Lagrangian dual relaxation of a box-constrained quadratic program.
//!
//! Wraps the primal problem
//!
//! ```text
//! minimize ½ xᵀQx + qᵀx    subject to    0 ≤ x ≤ ub
//! ```
//!
//! as an objective over the doubled dual variable `λ = (λ₊, λ₋)`:
//!
//! ```text
//! L(λ) = ½ xᵀQx + (q + λ₊ − λ₋)ᵀx − λ₊ᵀub,    where  Qx = −(q + λ₊ − λ₋).
//! ```
//!
//! The dual is to be *maximized* (over `λ ≥ 0`, enforced by the caller), so
//! `cost` returns `−L(λ)` and `gradient` returns `(ub − x, x)` — minimizing
//! the returned objective maximizes the dual.
//!
//! Every dual evaluation solves the same linear system with only the right
//! hand side changing, so the factorization of `Q` is computed once at
//! construction — Cholesky when `Q` is positive-definite (with an optional
//! nearest-positive-definite repair), an LU factorization on the symmetric
//! indefinite path — and reused for every solve. A one-slot memo keyed by
//! the last `λ` seen avoids recomputing `x` when `gradient` is called right
//! after `cost` at the same point, the usual calling pattern of
//! gradient-based solvers.
//!
//! As a side effect, each gradient evaluation projects the relaxed `x` onto
//! the box and keeps the best primal point found, available through
//! [`LagrangianBoxRelaxation::primal_incumbent`] once optimization ends.
//!
//! Interior caches live behind `RefCell`/`Cell`: the type is deliberately
//! not `Sync`, matching the strictly sequential execution model. A
//! concurrent reimplementation would need a per-call-context memo or a lock.

use descentopt_core::{
    error::{OptimError, Result},
    linalg::nearest_posdef,
    objective::{ObjectiveFunction, Quadratic},
    types::{DMatrix, DVector, Scalar},
};
use nalgebra::{linalg::Cholesky, linalg::LU, Dyn};
use num_traits::Float;
use std::cell::{Cell, RefCell};

/// Factorization of `Q`, computed once and reused for every dual solve.
#[derive(Debug)]
enum QFactorization<T: Scalar> {
    /// `Q = LLᵀ`, for positive-definite `Q`.
    Cholesky(Cholesky<T, Dyn>),
    /// Pivoted LU, the fallback for symmetric indefinite `Q`.
    Indefinite(LU<T, Dyn, Dyn>),
}

impl<T: Scalar> QFactorization<T> {
    fn solve(&self, rhs: &DVector<T>) -> DVector<T> {
        match self {
            Self::Cholesky(chol) => chol.solve(rhs),
            Self::Indefinite(lu) => lu
                .solve(rhs)
                .expect("Q invertibility is validated at construction"),
        }
    }
}

#[derive(Debug, Clone)]
struct SolveMemo<T: Scalar> {
    lmbda: DVector<T>,
    x: DVector<T>,
}

/// Dual objective of a box-constrained quadratic, with cached factorization.
#[derive(Debug)]
pub struct LagrangianBoxRelaxation<T: Scalar> {
    primal: Quadratic<T>,
    /// Coefficient matrix used on the dual side (the repaired copy when the
    /// repair path was chosen).
    q_matrix: DMatrix<T>,
    q_vector: DVector<T>,
    ub: DVector<T>,
    factorization: QFactorization<T>,
    memo: RefCell<Option<SolveMemo<T>>>,
    solve_count: Cell<usize>,
    incumbent: RefCell<Option<(DVector<T>, T)>>,
}

impl<T: Scalar> LagrangianBoxRelaxation<T> {
    /// Wraps `primal` with upper bounds `ub`.
    ///
    /// Uses Cholesky when `Q` is positive-definite and falls back to a
    /// pivoted LU factorization otherwise.
    ///
    /// # Errors
    ///
    /// Rejects bounds of the wrong dimension or with negative entries, and
    /// a singular `Q`.
    pub fn new(primal: Quadratic<T>, ub: DVector<T>) -> Result<Self> {
        validate_bounds(&primal, &ub)?;
        let q = primal.q_matrix().clone();
        let factorization = match q.clone().cholesky() {
            Some(chol) => QFactorization::Cholesky(chol),
            None => {
                let lu = q.clone().lu();
                if !lu.is_invertible() {
                    return Err(OptimError::numerical("Q is singular"));
                }
                QFactorization::Indefinite(lu)
            }
        };
        Ok(Self::assemble(primal, q, ub, factorization))
    }

    /// Wraps `primal`, repairing `Q` to its nearest positive-definite
    /// matrix first so that the Cholesky path is always taken.
    ///
    /// The dual evaluations use the repaired matrix; the primal heuristic
    /// is still scored on the unrepaired primal objective.
    pub fn new_repaired(primal: Quadratic<T>, ub: DVector<T>) -> Result<Self> {
        validate_bounds(&primal, &ub)?;
        let repaired = nearest_posdef(primal.q_matrix(), <T as Scalar>::from_f64(1e-8));
        let chol = repaired
            .clone()
            .cholesky()
            .ok_or_else(|| OptimError::numerical("positive-definite repair failed"))?;
        Ok(Self::assemble(
            primal,
            repaired,
            ub,
            QFactorization::Cholesky(chol),
        ))
    }

    fn assemble(
        primal: Quadratic<T>,
        q_matrix: DMatrix<T>,
        ub: DVector<T>,
        factorization: QFactorization<T>,
    ) -> Self {
        let q_vector = primal.q_vector().clone();
        Self {
            primal,
            q_matrix,
            q_vector,
            ub,
            factorization,
            memo: RefCell::new(None),
            solve_count: Cell::new(0),
            incumbent: RefCell::new(None),
        }
    }

    /// The wrapped primal objective.
    pub fn primal(&self) -> &Quadratic<T> {
        &self.primal
    }

    /// The box upper bounds.
    pub fn upper_bounds(&self) -> &DVector<T> {
        &self.ub
    }

    /// Best box-feasible primal point found so far, with its value.
    pub fn primal_incumbent(&self) -> Option<(DVector<T>, T)> {
        self.incumbent.borrow().clone()
    }

    /// Number of linear solves performed (memo hits excluded).
    pub fn linear_solves(&self) -> usize {
        self.solve_count.get()
    }

    /// Primal dimension `n` (the dual has `2n` variables).
    fn primal_dimension(&self) -> usize {
        self.q_vector.len()
    }

    /// The relaxed primal point for `λ`, through the one-slot memo.
    fn solve_for(&self, lmbda: &DVector<T>) -> DVector<T> {
        if let Some(memo) = self.memo.borrow().as_ref() {
            if memo.lmbda == *lmbda {
                return memo.x.clone();
            }
        }
        let x = self.factorization.solve(&(-self.shifted_q(lmbda)));
        self.solve_count.set(self.solve_count.get() + 1);
        *self.memo.borrow_mut() = Some(SolveMemo {
            lmbda: lmbda.clone(),
            x: x.clone(),
        });
        x
    }

    /// `q + λ₊ − λ₋`.
    fn shifted_q(&self, lmbda: &DVector<T>) -> DVector<T> {
        let n = self.primal_dimension();
        let lmbda_p = lmbda.rows(0, n);
        let lmbda_n = lmbda.rows(n, n);
        &self.q_vector + lmbda_p - lmbda_n
    }
}

impl<T: Scalar> ObjectiveFunction<T> for LagrangianBoxRelaxation<T> {
    fn dimension(&self) -> usize {
        2 * self.primal_dimension()
    }

    fn cost(&self, lmbda: &DVector<T>) -> T {
        let n = self.primal_dimension();
        let x = self.solve_for(lmbda);
        let ql = self.shifted_q(lmbda);
        let qx = &self.q_matrix * &x;
        let lagrangian = <T as Scalar>::from_f64(0.5) * x.dot(&qx) + ql.dot(&x)
            - lmbda.rows(0, n).dot(&self.ub);
        -lagrangian
    }

    fn gradient(&self, lmbda: &DVector<T>) -> DVector<T> {
        let n = self.primal_dimension();
        let x = self.solve_for(lmbda);
        let gradient = DVector::from_fn(2 * n, |i, _| {
            if i < n {
                self.ub[i] - x[i]
            } else {
                x[i - n]
            }
        });

        // Heuristic primal point: project the relaxed x onto the box and
        // keep the best value seen on the unrepaired primal.
        let projected = DVector::from_fn(n, |i, _| {
            <T as Float>::min(<T as Float>::max(x[i], T::zero()), self.ub[i])
        });
        let value = self.primal.cost(&projected);
        let mut incumbent = self.incumbent.borrow_mut();
        let improves = incumbent.as_ref().map_or(true, |(_, best)| value < *best);
        if improves {
            *incumbent = Some((projected, value));
        }

        gradient
    }
}

fn validate_bounds<T: Scalar>(primal: &Quadratic<T>, ub: &DVector<T>) -> Result<()> {
    if ub.len() != primal.dimension() {
        return Err(OptimError::dimension_mismatch(primal.dimension(), ub.len()));
    }
    if ub.iter().any(|u| *u < T::zero()) {
        return Err(OptimError::invalid_parameter(
            "upper bounds are not elementwise >= 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn box_problem() -> LagrangianBoxRelaxation<f64> {
        // min ½ xᵀ diag(2,2) x + (-2,-2)ᵀx over 0 ≤ x ≤ (0.5, 0.5);
        // the unconstrained minimizer (1,1) is outside the box, so the
        // primal optimum is the corner (0.5, 0.5) with value -1.5.
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 2.0]));
        let b = DVector::from_vec(vec![-2.0, -2.0]);
        let primal = Quadratic::new(q, b).unwrap();
        LagrangianBoxRelaxation::new(primal, DVector::from_vec(vec![0.5, 0.5])).unwrap()
    }

    #[test]
    fn test_memo_reuses_the_solve() {
        let dual = box_problem();
        let lmbda = DVector::from_vec(vec![0.1, 0.2, 0.0, 0.3]);
        let v1 = dual.cost(&lmbda);
        let _g = dual.gradient(&lmbda);
        assert_eq!(dual.linear_solves(), 1);

        // Bitwise identical result on re-evaluation: no drift.
        assert_eq!(dual.cost(&lmbda), v1);
        assert_eq!(dual.linear_solves(), 1);

        // A different multiplier does trigger a fresh solve.
        let other = DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0]);
        let _ = dual.cost(&other);
        assert_eq!(dual.linear_solves(), 2);
    }

    #[test]
    fn test_gradient_is_ub_minus_x_and_x() {
        let dual = box_problem();
        let lmbda = DVector::zeros(4);
        // At λ = 0 the relaxed point solves Qx = -q, i.e. x = (1,1).
        let g = dual.gradient(&lmbda);
        assert_relative_eq!(
            g,
            DVector::from_vec(vec![-0.5, -0.5, 1.0, 1.0]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_primal_heuristic_is_box_feasible() {
        let dual = box_problem();
        let _ = dual.gradient(&DVector::zeros(4));
        let (point, value) = dual.primal_incumbent().unwrap();
        for i in 0..2 {
            assert!(point[i] >= 0.0 && point[i] <= 0.5);
        }
        // The projection of (1,1) is the primal optimum here.
        assert_relative_eq!(point, DVector::from_vec(vec![0.5, 0.5]), epsilon = 1e-12);
        assert_relative_eq!(value, -1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_weak_duality_at_the_origin() {
        let dual = box_problem();
        let lmbda = DVector::zeros(4);
        let dual_value = -dual.cost(&lmbda); // L(0)
        let _ = dual.gradient(&lmbda);
        let (_, primal_value) = dual.primal_incumbent().unwrap();
        assert!(dual_value <= primal_value + 1e-12);
    }

    #[test]
    fn test_repaired_path_handles_indefinite_q() {
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]); // eigenvalues 3, -1
        let primal = Quadratic::new(q, DVector::from_vec(vec![-1.0, -1.0])).unwrap();
        let dual =
            LagrangianBoxRelaxation::new_repaired(primal, DVector::from_vec(vec![1.0, 1.0]))
                .unwrap();
        assert!(matches!(dual.factorization, QFactorization::Cholesky(_)));
        // Evaluation works against the repaired matrix.
        let v = dual.cost(&DVector::zeros(4));
        assert!(v.is_finite());
    }

    #[test]
    fn test_rejects_negative_bounds() {
        let primal = Quadratic::<f64>::simple(2);
        assert!(
            LagrangianBoxRelaxation::new(primal, DVector::from_vec(vec![1.0, -1.0])).is_err()
        );
    }

    #[test]
    fn test_rejects_wrong_bound_dimension() {
        let primal = Quadratic::<f64>::simple(2);
        assert!(LagrangianBoxRelaxation::new(primal, DVector::zeros(3)).is_err());
    }
}
