//! Steepest descent with a configurable line search.
//!
//! This is the base line-search iteration shared by gradient methods:
//! evaluate the gradient, test the norm-based stopping rule, walk along
//! `d = −g` with the configured step-size search, repeat. The curvature
//! parameter `m2` selects the search at construction: a value in `(0,1)`
//! picks Armijo–Wolfe, anything else plain Backtracking.
//!
//! Runtime outcomes are reported through [`Status`]:
//!
//! - `Optimal` — gradient norm fell below the (absolute or relative)
//!   threshold;
//! - `Unbounded` — a value at or below `m_inf` was found;
//! - `Stopped` — the evaluation budget ran out;
//! - `Error` — the line search collapsed below `min_a`, i.e. no admissible
//!   step exists numerically.

use descentopt_core::{
    error::{OptimError, Result},
    line_search::{LineSearchFailure, LineSearchParams, StepSearch},
    objective::ObjectiveFunction,
    solver::{EvalBudget, OptimizeResult, Status, StoppingCriterion},
    types::{DVector, Scalar},
};
use log::debug;
use num_traits::Float;

/// Configuration for [`SteepestDescent`].
#[derive(Debug, Clone, Copy)]
pub struct SteepestDescentConfig<T: Scalar> {
    /// Stopping accuracy on the gradient norm; negative selects the
    /// relative criterion (threshold `-eps·‖g₀‖`).
    pub eps: T,
    /// Maximum number of objective evaluations, line-search trials included.
    pub max_f_eval: usize,
    /// Line-search parameters; `m2` selects the strategy.
    pub line_search: LineSearchParams<T>,
    /// Unboundedness threshold: a value at or below this stops the run.
    pub m_inf: T,
}

impl<T: Scalar> Default for SteepestDescentConfig<T> {
    fn default() -> Self {
        Self {
            eps: <T as Scalar>::from_f64(1e-6),
            max_f_eval: 1000,
            line_search: LineSearchParams::default(),
            m_inf: <T as Float>::neg_infinity(),
        }
    }
}

impl<T: Scalar> SteepestDescentConfig<T> {
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

    /// Sets the line-search parameters.
    pub fn with_line_search(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search = params;
        self
    }

    /// Sets the unboundedness threshold.
    pub fn with_m_inf(mut self, m_inf: T) -> Self {
        self.m_inf = m_inf;
        self
    }
}

/// Steepest descent optimizer.
#[derive(Debug, Clone)]
pub struct SteepestDescent<T: Scalar> {
    config: SteepestDescentConfig<T>,
    search: StepSearch<T>,
}

impl<T: Scalar> SteepestDescent<T> {
    /// Creates the optimizer, validating the configuration eagerly.
    ///
    /// # Errors
    ///
    /// Besides the line-search parameter ranges, `m1` must be strictly
    /// positive here (the search is always used) and the budget non-zero.
    pub fn new(config: SteepestDescentConfig<T>) -> Result<Self> {
        if config.max_f_eval == 0 {
            return Err(OptimError::invalid_parameter("max_f_eval is not >= 1"));
        }
        if config.line_search.m1 <= T::zero() {
            return Err(OptimError::invalid_parameter("m1 is not in (0,1)"));
        }
        let search = StepSearch::from_params(config.line_search)?;
        Ok(Self { config, search })
    }

    /// The selected line-search strategy name.
    pub fn line_search_name(&self) -> &str {
        self.search.name()
    }

    /// Minimizes `f` starting from `start` (or the objective's canonical
    /// starting point when `None`).
    ///
    /// # Errors
    ///
    /// Only a starting point of the wrong dimension is an error; every
    /// runtime outcome is reported through the result's [`Status`].
    pub fn minimize<F>(&self, f: &F, start: Option<DVector<T>>) -> Result<OptimizeResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let mut x = resolve_start(f, start)?;
        let cfg = &self.config;
        let mut budget = EvalBudget::new(cfg.max_f_eval);

        budget.record();
        let (mut value, mut gradient) = f.cost_and_gradient(&x);
        let mut ng = gradient.norm();
        let threshold = StoppingCriterion::new(cfg.eps).threshold(ng);
        let f_star = f.f_star();

        let mut iterations = 0;
        let status = loop {
            log_progress("steepest", budget.used(), value, ng, f_star);

            if ng <= threshold {
                break Status::Optimal;
            }
            if value <= cfg.m_inf {
                break Status::Unbounded;
            }
            if budget.exhausted() {
                break Status::Stopped;
            }

            let direction = -&gradient;
            let dir_deriv = -(ng * ng);
            let outcome = self.search.search(
                f,
                &x,
                &direction,
                value,
                dir_deriv,
                cfg.line_search.a_start,
                &mut budget,
            );
            match outcome.failure {
                Some(LineSearchFailure::StepCollapsed) => break Status::Error,
                Some(LineSearchFailure::BudgetExhausted) => break Status::Stopped,
                None => {}
            }
            if outcome.step <= cfg.line_search.min_a {
                break Status::Error;
            }

            x = outcome.point;
            value = outcome.value;
            gradient = outcome.gradient;
            ng = gradient.norm();
            iterations += 1;
        };

        Ok(OptimizeResult {
            point: x,
            value,
            gradient_norm: ng,
            iterations,
            f_evals: budget.used(),
            status,
        })
    }
}

/// Resolves the caller's starting point against the objective's default.
pub(crate) fn resolve_start<T, F>(f: &F, start: Option<DVector<T>>) -> Result<DVector<T>>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    match start {
        Some(x) => {
            if x.len() != f.dimension() {
                return Err(OptimError::dimension_mismatch(f.dimension(), x.len()));
            }
            Ok(x)
        }
        None => Ok(f.initial_point()),
    }
}

/// Per-iteration diagnostic record, using the relative gap when the optimal
/// value is known.
pub(crate) fn log_progress<T: Scalar>(solver: &str, f_evals: usize, value: T, norm: T, f_star: T) {
    if f_star > <T as Float>::neg_infinity() {
        let denom = <T as Float>::max(<T as Float>::abs(f_star), T::one());
        debug!(
            "{}: f_eval={} rel_gap={:e} norm={:e}",
            solver,
            f_evals,
            ((value - f_star) / denom).to_f64(),
            norm.to_f64()
        );
    } else {
        debug!(
            "{}: f_eval={} f={:e} norm={:e}",
            solver,
            f_evals,
            value.to_f64(),
            norm.to_f64()
        );
    }
}
