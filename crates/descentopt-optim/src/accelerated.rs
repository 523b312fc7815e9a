//! Accelerated (momentum) gradient method.
//!
//! The method iterates on an auxiliary extrapolation sequence `y` distinct
//! from the incumbent `x`: each iteration evaluates `f` and its gradient at
//! `y`, takes either a fixed step `|a_start|` or a backtracking line-search
//! step along `−g(y)`, and forms the next `y` with one of four selectable
//! momentum formulas. In the monotone variant the incumbent only moves to a
//! point that improves the best value seen, at the price of one extra
//! function evaluation per iteration.
//!
//! # Momentum formulas
//!
//! - [`MomentumFormula::GammaRecursion`]: classical Nesterov recursion
//!   `γ₊ = (√(4γ²+γ⁴) − γ²)/2`, `β = γ₊(1/γ − 1)`;
//! - [`MomentumFormula::Fista`]: `γ₊ = (1+√(1+4γ))/2`, `β = (γ−1)/γ₊`;
//! - [`MomentumFormula::LinearSchedule`]: `β = t/(t+3)`;
//! - [`MomentumFormula::AccumulatedDirection`]: keeps a running weighted
//!   gradient average and blends a separately extrapolated point `z`
//!   instead of using `β` at all.
//!
//! For the first three, `y₊ = x₊ + β(x₊ − x)`.
//!
//! # References
//!
//! - Nesterov, "A method for solving the convex programming problem with
//!   convergence rate O(1/k²)" (1983).
//! - Beck & Teboulle, "A fast iterative shrinkage-thresholding algorithm"
//!   (2009).

use crate::steepest::{log_progress, resolve_start};
use descentopt_core::{
    error::{OptimError, Result},
    line_search::{BacktrackingLineSearch, LineSearchFailure, LineSearchParams},
    objective::ObjectiveFunction,
    solver::{EvalBudget, OptimizeResult, Status, StoppingCriterion},
    types::{DVector, Scalar},
};
use descentopt_core::line_search::LineSearch;
use num_traits::Float;

/// Extrapolation formula used to build the next auxiliary point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumFormula {
    /// Classical Nesterov `γ` recursion.
    GammaRecursion,
    /// FISTA-style `γ` recursion.
    Fista,
    /// Simple schedule `β = t/(t+3)`.
    LinearSchedule,
    /// Weighted gradient accumulation with an extrapolated auxiliary point.
    AccumulatedDirection,
}

impl MomentumFormula {
    /// Resolves the numeric formula index `wf ∈ {0,1,2,3}`.
    pub fn from_index(wf: usize) -> Result<Self> {
        match wf {
            0 => Ok(Self::GammaRecursion),
            1 => Ok(Self::Fista),
            2 => Ok(Self::LinearSchedule),
            3 => Ok(Self::AccumulatedDirection),
            _ => Err(OptimError::invalid_parameter(format!(
                "unknown fast gradient formula {wf}"
            ))),
        }
    }
}

/// Configuration for [`AcceleratedGradient`].
#[derive(Debug, Clone, Copy)]
pub struct AcceleratedGradientConfig<T: Scalar> {
    /// Stopping accuracy on the gradient norm at `y`; negative selects the
    /// relative criterion.
    pub eps: T,
    /// Maximum number of objective evaluations.
    pub max_f_eval: usize,
    /// `|a_start|` is the initial step (the estimate of `1/L`). With the
    /// line search enabled, a negative value makes each search start from
    /// the previously accepted step.
    pub a_start: T,
    /// Armijo parameter in `[0,1)`; zero disables the line search and uses
    /// the fixed step `|a_start|`.
    pub m1: T,
    /// Backtracking shrink factor in `(0,1)`.
    pub tau: T,
    /// Step-collapse threshold.
    pub min_a: T,
    /// Unboundedness threshold.
    pub m_inf: T,
    /// Extrapolation formula.
    pub momentum: MomentumFormula,
    /// Monotone variant: the incumbent only improves.
    pub monotone: bool,
}

impl<T: Scalar> Default for AcceleratedGradientConfig<T> {
    fn default() -> Self {
        Self {
            eps: <T as Scalar>::from_f64(1e-6),
            max_f_eval: 1000,
            a_start: T::one(),
            m1: T::zero(),
            tau: <T as Scalar>::from_f64(0.9),
            min_a: T::DEFAULT_MIN_STEP,
            m_inf: <T as Float>::neg_infinity(),
            momentum: MomentumFormula::GammaRecursion,
            monotone: true,
        }
    }
}

impl<T: Scalar> AcceleratedGradientConfig<T> {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stopping accuracy.
    pub fn with_eps(mut self, eps: T) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the evaluation budget.
    pub fn with_max_f_eval(mut self, max_f_eval: usize) -> Self {
        self.max_f_eval = max_f_eval;
        self
    }

    /// Sets the initial (or fixed) step size.
    pub fn with_a_start(mut self, a_start: T) -> Self {
        self.a_start = a_start;
        self
    }

    /// Sets the Armijo parameter (zero = fixed step).
    pub fn with_m1(mut self, m1: T) -> Self {
        self.m1 = m1;
        self
    }

    /// Sets the momentum formula.
    pub fn with_momentum(mut self, momentum: MomentumFormula) -> Self {
        self.momentum = momentum;
        self
    }

    /// Enables or disables the monotone variant.
    pub fn with_monotone(mut self, monotone: bool) -> Self {
        self.monotone = monotone;
        self
    }
}

/// Accelerated gradient optimizer.
#[derive(Debug, Clone)]
pub struct AcceleratedGradient<T: Scalar> {
    config: AcceleratedGradientConfig<T>,
    line_search: Option<BacktrackingLineSearch<T>>,
}

impl<T: Scalar> AcceleratedGradient<T> {
    /// Creates the optimizer, validating the configuration eagerly.
    pub fn new(config: AcceleratedGradientConfig<T>) -> Result<Self> {
        if config.max_f_eval == 0 {
            return Err(OptimError::invalid_parameter("max_f_eval is not >= 1"));
        }
        if config.m1 < T::zero() || config.m1 >= T::one() {
            return Err(OptimError::invalid_parameter("m1 is not in [0,1)"));
        }
        if config.a_start == T::zero() {
            return Err(OptimError::invalid_parameter("a_start is not non-zero"));
        }
        if config.tau <= T::zero() || config.tau >= T::one() {
            return Err(OptimError::invalid_parameter("tau is not in (0,1)"));
        }
        if config.min_a <= T::zero() {
            return Err(OptimError::invalid_parameter("min_a is not > 0"));
        }
        let line_search = if config.m1 > T::zero() {
            let params = LineSearchParams {
                a_start: <T as Float>::abs(config.a_start),
                tau: config.tau,
                m1: config.m1,
                m2: T::zero(), // unused by backtracking
                sfgrd: <T as Scalar>::from_f64(0.01),
                min_a: config.min_a,
            };
            Some(BacktrackingLineSearch::new(params)?)
        } else {
            None
        };
        Ok(Self {
            config,
            line_search,
        })
    }

    /// Minimizes `f` starting from `start` (or the objective's canonical
    /// starting point when `None`).
    pub fn minimize<F>(&self, f: &F, start: Option<DVector<T>>) -> Result<OptimizeResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let cfg = &self.config;
        let x0 = resolve_start(f, start)?;
        let n = x0.len();
        let f_star = f.f_star();

        let mut budget = EvalBudget::new(cfg.max_f_eval);
        let criterion = StoppingCriterion::new(cfg.eps);
        let mut threshold = None;

        // Incumbent, its value when known, and the auxiliary sequence.
        let mut x = x0.clone();
        let mut x_value: Option<T> = None;
        let mut best_value = <T as Float>::infinity();
        let mut y = x0;

        let mut gamma = T::one();
        let mut avg_dir = DVector::zeros(n); // running direction of wf=3
        let mut adaptive_step = <T as Float>::abs(cfg.a_start);
        let adaptive = cfg.a_start < T::zero();

        let mut last_norm = T::zero();
        let mut t = 1usize; // extrapolation counter
        let status = loop {
            if budget.exhausted() {
                break Status::Stopped;
            }
            budget.record();
            let (v, g) = f.cost_and_gradient(&y);
            let ng = g.norm();
            last_norm = ng;
            let thr = *threshold.get_or_insert_with(|| criterion.threshold(ng));

            if cfg.monotone && v < best_value {
                x = y.clone();
                best_value = v;
                x_value = Some(v);
            }

            log_progress("accelerated", budget.used(), v, ng, f_star);

            if ng <= thr {
                if !cfg.monotone {
                    // y is the certified point; report it.
                    x = y;
                    x_value = Some(v);
                }
                break Status::Optimal;
            }
            if v <= cfg.m_inf {
                break Status::Unbounded;
            }

            // Step along d = -g(y), by line search or fixed size.
            let step;
            let mut next_x;
            let next_value;
            if let Some(ls) = &self.line_search {
                let direction = -&g;
                let outcome = ls.search(
                    f,
                    &y,
                    &direction,
                    v,
                    -(ng * ng),
                    adaptive_step,
                    &mut budget,
                );
                match outcome.failure {
                    Some(LineSearchFailure::BudgetExhausted) => break Status::Stopped,
                    Some(LineSearchFailure::StepCollapsed) => break Status::Error,
                    None => {}
                }
                step = outcome.step;
                next_x = outcome.point;
                next_value = Some(outcome.value);
                if adaptive {
                    adaptive_step = step;
                }
            } else {
                step = <T as Float>::abs(cfg.a_start);
                next_x = &y - &g * step;
                next_value = if cfg.monotone {
                    if budget.exhausted() {
                        break Status::Stopped;
                    }
                    budget.record();
                    Some(f.cost(&next_x))
                } else {
                    None
                };
            }

            if step <= cfg.min_a {
                break Status::Error;
            }
            if let Some(nv) = next_value {
                if nv <= cfg.m_inf {
                    break Status::Unbounded;
                }
            }

            if cfg.monotone {
                // Keep the new point only if it improves on the best seen;
                // otherwise the recursion continues from the incumbent.
                let nv = next_value.expect("monotone mode always evaluates the trial");
                if nv <= best_value {
                    best_value = nv;
                    x_value = Some(nv);
                } else {
                    next_x = x.clone();
                }
            }

            // Extrapolate the next auxiliary point.
            match cfg.momentum {
                MomentumFormula::GammaRecursion => {
                    let past = gamma;
                    let g2 = gamma * gamma;
                    gamma = (<T as Float>::sqrt(
                        <T as Scalar>::from_f64(4.0) * g2 + g2 * g2,
                    ) - g2)
                        / <T as Scalar>::from_f64(2.0);
                    let beta = gamma * (T::one() / past - T::one());
                    y = &next_x + (&next_x - &x) * beta;
                }
                MomentumFormula::Fista => {
                    let past = gamma;
                    gamma = (T::one()
                        + <T as Float>::sqrt(T::one() + <T as Scalar>::from_f64(4.0) * past))
                        / <T as Scalar>::from_f64(2.0);
                    let beta = (past - T::one()) / gamma;
                    y = &next_x + (&next_x - &x) * beta;
                }
                MomentumFormula::LinearSchedule => {
                    let ti = <T as Scalar>::from_usize(t);
                    let beta = ti / (ti + <T as Scalar>::from_f64(3.0));
                    y = &next_x + (&next_x - &x) * beta;
                }
                MomentumFormula::AccumulatedDirection => {
                    let ti = <T as Scalar>::from_usize(t);
                    let two = <T as Scalar>::from_f64(2.0);
                    let denom = ti + two;
                    avg_dir = g * (two / denom) + &avg_dir * (ti / denom);
                    let scale = -((ti + T::one()) * (ti + two) * step
                        / <T as Scalar>::from_f64(4.0));
                    let z = &avg_dir * scale;
                    let blend = ti + <T as Scalar>::from_f64(3.0);
                    y = z * (two / blend) + &next_x * ((ti + T::one()) / blend);
                }
            }

            x = next_x;
            if !cfg.monotone {
                // Known after a line search, unknown after a fixed step.
                x_value = next_value;
            }
            t += 1;
        };

        // In the non-monotone fixed-step path the incumbent's value was
        // never evaluated; spend one evaluation to report it faithfully.
        let value = match x_value {
            Some(v) => v,
            None => {
                budget.record();
                f.cost(&x)
            }
        };

        Ok(OptimizeResult {
            point: x,
            value,
            gradient_norm: last_norm,
            iterations: t - 1,
            f_evals: budget.used(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descentopt_core::objective::Quadratic;

    #[test]
    fn test_formula_index_resolution() {
        assert_eq!(
            MomentumFormula::from_index(0).unwrap(),
            MomentumFormula::GammaRecursion
        );
        assert_eq!(MomentumFormula::from_index(1).unwrap(), MomentumFormula::Fista);
        assert!(MomentumFormula::from_index(4).is_err());
    }

    #[test]
    fn test_config_validation() {
        let bad = AcceleratedGradientConfig::<f64>::default().with_m1(1.0);
        assert!(AcceleratedGradient::new(bad).is_err());

        let bad = AcceleratedGradientConfig::<f64>::default().with_a_start(0.0);
        assert!(AcceleratedGradient::new(bad).is_err());

        let bad = AcceleratedGradientConfig::<f64> {
            tau: 1.0,
            ..AcceleratedGradientConfig::default()
        };
        assert!(AcceleratedGradient::new(bad).is_err());
    }

    #[test]
    fn test_fixed_step_converges_on_sphere() {
        // f(x) = ½‖x‖², L = 1: the fixed step 1 lands on the minimizer.
        let f = Quadratic::<f64>::simple(3);
        let solver =
            AcceleratedGradient::new(AcceleratedGradientConfig::default()).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![1.0, -2.0, 0.5])))
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!(result.point.norm() <= 1e-6);
    }

    #[test]
    fn test_line_search_converges() {
        let f = Quadratic::<f64>::simple(2);
        let config = AcceleratedGradientConfig::default()
            .with_m1(0.1)
            .with_monotone(false)
            .with_max_f_eval(5000);
        let solver = AcceleratedGradient::new(config).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![3.0, 4.0])))
            .unwrap();
        assert_eq!(result.status, Status::Optimal);
        assert!(result.point.norm() <= 1e-5);
    }

    #[test]
    fn test_budget_reports_stopped() {
        let f = Quadratic::<f64>::simple(2);
        let config = AcceleratedGradientConfig::default()
            .with_a_start(1e-3) // tiny fixed step: cannot converge in time
            .with_max_f_eval(10);
        let solver = AcceleratedGradient::new(config).unwrap();
        let result = solver
            .minimize(&f, Some(DVector::from_vec(vec![10.0, 10.0])))
            .unwrap();
        assert_eq!(result.status, Status::Stopped);
    }
}
