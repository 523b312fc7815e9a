//! Proximal bundle method for (possibly non-smooth) convex minimization.
//!
//! The method maintains a cutting-plane lower model of the objective — the
//! [`Bundle`] — plus a quadratic stabilization term of fixed weight `mu`.
//! Each iteration solves the stabilized master problem (delegated to a
//! [`MasterSolver`]), tests the direction-norm stopping rule
//! `mu·‖d‖ ≤ eps·ng0`, evaluates the true objective at the trial point, and
//! either moves the stability center there (Serious Step, when the actual
//! decrease is at least the `m1` fraction of the decrease the model
//! predicted) or keeps it (Null Step). Either way the trial's cutting plane
//! is appended before the next iteration.
//!
//! When the objective publishes a finite `f_star`, that bound enters the
//! model as one more affine piece with zero gradient — the "cheat" that
//! lets the method certify optimality instead of only stalling.
//!
//! # References
//!
//! - Hiriart-Urruty & Lemaréchal, "Convex Analysis and Minimization
//!   Algorithms II", ch. XV.

use crate::master::{MasterSolver, SimplexDualSolver};
use crate::steepest::resolve_start;
use descentopt_core::{
    error::{OptimError, Result},
    objective::ObjectiveFunction,
    solver::{OptimizeResult, Status, StoppingCriterion},
    types::{DVector, Scalar},
};
use log::{debug, warn};
use num_traits::Float;

/// One affine piece of the cutting-plane model, stored in translated form:
/// the piece generated at `(xᵢ, fᵢ, gᵢ)` is `p(z) = bᵢ + gᵢ·z` with
/// `bᵢ = fᵢ − gᵢ·xᵢ`, so it reproduces `fᵢ` at `xᵢ` and lower-bounds a
/// convex objective everywhere.
#[derive(Debug, Clone)]
pub struct Cut<T: Scalar> {
    gradient: DVector<T>,
    intercept: T,
}

impl<T: Scalar> Cut<T> {
    /// Builds the piece from an evaluation `(point, value, gradient)`.
    pub fn new(gradient: DVector<T>, value: T, point: &DVector<T>) -> Self {
        let intercept = value - gradient.dot(point);
        Self {
            gradient,
            intercept,
        }
    }

    /// Builds a constant lower-bound piece (zero gradient).
    pub fn lower_bound(dimension: usize, bound: T) -> Self {
        Self {
            gradient: DVector::zeros(dimension),
            intercept: bound,
        }
    }

    /// The piece's (sub)gradient.
    pub fn gradient(&self) -> &DVector<T> {
        &self.gradient
    }

    /// The translated intercept `bᵢ = fᵢ − gᵢ·xᵢ`.
    pub fn intercept(&self) -> T {
        self.intercept
    }

    /// Evaluates the piece at `z`.
    pub fn value_at(&self, z: &DVector<T>) -> T {
        self.intercept + self.gradient.dot(z)
    }
}

/// Append-only collection of cutting planes; the piecewise-linear maximum
/// of its pieces lower-bounds the objective.
#[derive(Debug, Clone, Default)]
pub struct Bundle<T: Scalar> {
    cuts: Vec<Cut<T>>,
}

impl<T: Scalar> Bundle<T> {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self { cuts: Vec::new() }
    }

    /// Appends a piece. Pieces are never removed.
    pub fn push(&mut self, cut: Cut<T>) {
        self.cuts.push(cut);
    }

    /// Number of pieces.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// True when no piece was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// The pieces, in insertion order.
    pub fn cuts(&self) -> &[Cut<T>] {
        &self.cuts
    }

    /// Value of the piecewise-linear model at `z`.
    pub fn model_value_at(&self, z: &DVector<T>) -> T {
        self.cuts
            .iter()
            .map(|c| c.value_at(z))
            .fold(<T as Float>::neg_infinity(), <T as Float>::max)
    }
}

/// Configuration for [`ProximalBundle`].
#[derive(Debug, Clone, Copy)]
pub struct ProximalBundleConfig<T: Scalar> {
    /// Fixed stabilization weight, `> 0`.
    pub mu: T,
    /// Serious-step parameter in `[0,1)`: the trial is accepted when the
    /// actual decrease reaches this fraction of the model's decrease.
    pub m1: T,
    /// Stopping accuracy on `mu·‖d‖`; negative selects the relative
    /// criterion against the first subgradient norm.
    pub eps: T,
    /// Iteration budget (one objective evaluation per iteration).
    pub max_iter: usize,
    /// Unboundedness threshold.
    pub m_inf: T,
    /// Inject the objective's finite `f_star`, when known, as a constant
    /// lower-bound piece.
    pub use_lower_bound: bool,
}

impl<T: Scalar> Default for ProximalBundleConfig<T> {
    fn default() -> Self {
        Self {
            mu: T::one(),
            m1: <T as Scalar>::from_f64(0.01),
            eps: <T as Scalar>::from_f64(1e-6),
            max_iter: 1000,
            m_inf: <T as Float>::neg_infinity(),
            use_lower_bound: true,
        }
    }
}

impl<T: Scalar> ProximalBundleConfig<T> {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stabilization weight.
    pub fn with_mu(mut self, mu: T) -> Self {
        self.mu = mu;
        self
    }

    /// Sets the serious-step parameter.
    pub fn with_m1(mut self, m1: T) -> Self {
        self.m1 = m1;
        self
    }

    /// Sets the stopping accuracy.
    pub fn with_eps(mut self, eps: T) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Enables or disables the `f_star` lower-bound piece.
    pub fn with_lower_bound(mut self, use_lower_bound: bool) -> Self {
        self.use_lower_bound = use_lower_bound;
        self
    }
}

/// Proximal bundle optimizer.
#[derive(Debug, Clone)]
pub struct ProximalBundle<T: Scalar, M = SimplexDualSolver>
where
    M: MasterSolver<T>,
{
    config: ProximalBundleConfig<T>,
    master: M,
}

impl<T: Scalar> ProximalBundle<T> {
    /// Creates the optimizer with the default master backend.
    pub fn new(config: ProximalBundleConfig<T>) -> Result<Self> {
        Self::with_master(config, SimplexDualSolver::new())
    }
}

impl<T: Scalar, M: MasterSolver<T>> ProximalBundle<T, M> {
    /// Creates the optimizer with a custom master backend.
    pub fn with_master(config: ProximalBundleConfig<T>, master: M) -> Result<Self> {
        if config.mu <= T::zero() {
            return Err(OptimError::invalid_parameter("mu is not > 0"));
        }
        if config.m1 < T::zero() || config.m1 >= T::one() {
            return Err(OptimError::invalid_parameter("m1 is not in [0,1)"));
        }
        if config.max_iter == 0 {
            return Err(OptimError::invalid_parameter("max_iter is not >= 1"));
        }
        Ok(Self { config, master })
    }

    /// Minimizes `f` starting from `start` (or the objective's canonical
    /// starting point when `None`).
    pub fn minimize<F>(&self, f: &F, start: Option<DVector<T>>) -> Result<OptimizeResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let cfg = &self.config;
        let mut x = resolve_start(f, start)?;
        let n = x.len();
        let f_star = f.f_star();

        let (mut fx, g) = f.cost_and_gradient(&x);
        let mut f_evals = 1usize;
        let ng = g.norm();
        let threshold = StoppingCriterion::new(cfg.eps).threshold(ng);

        let mut bundle = Bundle::new();
        bundle.push(Cut::new(g, fx, &x));
        if cfg.use_lower_bound && f_star > <T as Float>::neg_infinity() {
            bundle.push(Cut::lower_bound(n, f_star));
        }

        let mut iterations = 0usize;
        let mut last_nd = ng;
        let status = loop {
            let solution = match self.master.solve(bundle.cuts(), &x, cfg.mu) {
                Ok(solution) => solution,
                Err(err) => {
                    warn!("bundle: master problem failed: {err}");
                    break Status::Error;
                }
            };
            let nd = solution.direction.norm();
            last_nd = nd;
            debug!(
                "bundle: iter={} f={:e} |d|={:e} pieces={}",
                iterations,
                fx.to_f64(),
                nd.to_f64(),
                bundle.len()
            );

            if cfg.mu * nd <= threshold {
                break Status::Optimal;
            }
            if iterations >= cfg.max_iter {
                break Status::Stopped;
            }

            let trial = &x + &solution.direction;
            let (fd, g) = f.cost_and_gradient(&trial);
            f_evals += 1;

            if fd <= cfg.m_inf {
                break Status::Unbounded;
            }

            bundle.push(Cut::new(g, fd, &trial));

            // Serious / Null step decision.
            if fd <= fx + cfg.m1 * (solution.model_value - fx) {
                debug!("bundle: serious step");
                x = trial;
                fx = fd;
            } else {
                debug!("bundle: null step");
            }
            iterations += 1;
        };

        Ok(OptimizeResult {
            point: x,
            value: fx,
            gradient_norm: last_nd,
            iterations,
            f_evals,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use descentopt_core::objective::Quadratic;

    /// f(x) = Σ|xᵢ|, minimized at the origin; gradient is a subgradient.
    #[derive(Debug)]
    struct AbsSum {
        dim: usize,
    }

    impl ObjectiveFunction<f64> for AbsSum {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn cost(&self, x: &DVector<f64>) -> f64 {
            x.iter().map(|v| v.abs()).sum()
        }

        fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            x.map(f64::signum)
        }
    }

    #[test]
    fn test_cut_reproduces_generating_evaluation() {
        let point = DVector::from_vec(vec![2.0, -1.0]);
        let gradient = DVector::from_vec(vec![0.3, 0.7]);
        let cut = Cut::new(gradient, 5.0, &point);
        assert_relative_eq!(cut.value_at(&point), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bundle_model_lower_bounds_convex_objective() {
        let f = Quadratic::<f64>::simple(2);
        let mut bundle = Bundle::new();
        for p in [vec![1.0, 0.0], vec![0.0, 2.0], vec![-1.0, -1.0]] {
            let p = DVector::from_vec(p);
            bundle.push(Cut::new(f.gradient(&p), f.cost(&p), &p));
        }
        let probe = DVector::from_vec(vec![0.5, 0.5]);
        assert!(bundle.model_value_at(&probe) <= f.cost(&probe) + 1e-12);
    }

    #[test]
    fn test_minimizes_abs_sum() {
        let f = AbsSum { dim: 2 };
        let solver = ProximalBundle::new(ProximalBundleConfig::default()).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![1.0, -0.5])))
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!(result.value <= 1e-4);
    }

    #[test]
    fn test_minimizes_quadratic_with_lower_bound_cheat() {
        let f = Quadratic::<f64>::simple(2);
        let solver = ProximalBundle::new(ProximalBundleConfig::default()).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![1.0, 0.0])))
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!(result.value <= 1e-6);
        assert!(result.point.norm() <= 1e-2);
    }

    #[test]
    fn test_iteration_budget_reports_stopped() {
        let f = AbsSum { dim: 3 };
        let config = ProximalBundleConfig::default().with_max_iter(2);
        let solver = ProximalBundle::new(config).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![5.0, 5.0, 5.0])))
            .unwrap();
        assert_eq!(result.status, Status::Stopped);
        assert_eq!(result.f_evals, 3); // initial + one per iteration
    }

    #[test]
    fn test_config_validation() {
        let bad = ProximalBundleConfig::<f64>::default().with_mu(0.0);
        assert!(ProximalBundle::new(bad).is_err());
        let bad = ProximalBundleConfig::<f64>::default().with_m1(1.0);
        assert!(ProximalBundle::new(bad).is_err());
    }
}
