//! Shared status, result and budget types for all solvers.
//!
//! Every algorithm in this workspace reports its outcome through the same
//! terminal [`Status`] and [`OptimizeResult`] shape, and spends function
//! evaluations from a single [`EvalBudget`] that is shared between the outer
//! iteration and any nested line search.

use crate::types::{DVector, Scalar};
use std::fmt;

/// Terminal status of an optimization run.
///
/// Runtime outcomes are values, never panics or errors: "did not converge"
/// and "numerically stalled" are expected conditions the caller decides how
/// to handle. The status is written exactly once, when the iteration loop
/// breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The stopping criterion was satisfied: the returned point is
    /// (approximately) optimal.
    Optimal,
    /// A value below the `m_inf` threshold was found; the objective is
    /// taken to be unbounded below.
    Unbounded,
    /// The evaluation/iteration budget was exhausted before convergence.
    Stopped,
    /// The algorithm could not continue: the line search collapsed below
    /// the minimum step, or the master problem solve failed.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Optimal => "optimal",
            Status::Unbounded => "unbounded",
            Status::Stopped => "stopped",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of an optimization run: the best point found plus diagnostics.
#[derive(Debug, Clone)]
pub struct OptimizeResult<T: Scalar> {
    /// The best solution found so far.
    pub point: DVector<T>,
    /// Objective value at `point`.
    pub value: T,
    /// Norm of the last gradient (or subgradient / master direction) seen.
    pub gradient_norm: T,
    /// Number of outer iterations performed.
    pub iterations: usize,
    /// Total objective evaluations spent, line searches included.
    pub f_evals: usize,
    /// Why the run terminated.
    pub status: Status,
}

impl<T: Scalar> OptimizeResult<T> {
    /// True when the run terminated with [`Status::Optimal`].
    pub fn converged(&self) -> bool {
        self.status == Status::Optimal
    }
}

/// Function-evaluation budget shared by an outer loop and its line search.
///
/// The counter is monotone non-decreasing; once `exhausted` reports true the
/// owning loop terminates with [`Status::Stopped`]. A line search checks the
/// budget before each trial evaluation, so the final count can overshoot
/// `max` by at most one inner pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalBudget {
    used: usize,
    max: usize,
}

impl EvalBudget {
    /// Creates a budget allowing `max_f_eval` objective evaluations.
    pub fn new(max_f_eval: usize) -> Self {
        Self {
            used: 0,
            max: max_f_eval,
        }
    }

    /// Records one objective evaluation.
    pub fn record(&mut self) {
        self.used += 1;
    }

    /// True when no further evaluations are allowed.
    pub fn exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Evaluations spent so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// The configured maximum.
    pub fn max(&self) -> usize {
        self.max
    }
}

/// Norm-based stopping rule with absolute and relative variants.
///
/// A non-negative `eps` is an absolute threshold on the tested norm. A
/// negative `eps` selects the *relative* criterion: the threshold becomes
/// `-eps` times the norm of the first gradient (or first master direction),
/// which makes the test invariant to a positive rescaling of the objective.
#[derive(Debug, Clone, Copy)]
pub struct StoppingCriterion<T: Scalar> {
    eps: T,
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates the rule. Any real `eps` is recognized.
    pub fn new(eps: T) -> Self {
        Self { eps }
    }

    /// The configured accuracy parameter.
    pub fn eps(&self) -> T {
        self.eps
    }

    /// Resolves the threshold once the first norm is known.
    pub fn threshold(&self, first_norm: T) -> T {
        if self.eps < T::zero() {
            -self.eps * first_norm
        } else {
            self.eps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Optimal.to_string(), "optimal");
        assert_eq!(Status::Error.to_string(), "error");
    }

    #[test]
    fn test_budget_counts() {
        let mut budget = EvalBudget::new(2);
        assert!(!budget.exhausted());
        budget.record();
        budget.record();
        assert!(budget.exhausted());
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn test_stopping_threshold() {
        let absolute = StoppingCriterion::new(1e-6);
        assert_eq!(absolute.threshold(123.0), 1e-6);

        let relative = StoppingCriterion::new(-1e-6);
        assert_eq!(relative.threshold(100.0), 1e-4);
        // Scale invariance: scaling the first norm scales the threshold.
        assert_eq!(relative.threshold(200.0), 2e-4);
    }
}
