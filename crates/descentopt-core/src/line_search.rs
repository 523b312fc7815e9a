//! One-dimensional step-size searches along a descent direction.
//!
//! Two interchangeable strategies share the [`LineSearch`] trait:
//!
//! - [`BacktrackingLineSearch`]: starts from a candidate step and shrinks it
//!   by `tau` until the Armijo sufficient-decrease condition
//!   `φ(a) ≤ φ(0) + m1·a·φ'(0)` holds.
//! - [`ArmijoWolfeLineSearch`]: additionally enforces the strong curvature
//!   condition `|φ'(a)| ≤ m2·|φ'(0)|` through a bracketing phase (the step
//!   grows while the slope stays negative and sufficient decrease holds)
//!   followed by safeguarded quadratic interpolation inside the bracket.
//!
//! Both spend trial evaluations from the caller's [`EvalBudget`], and both
//! report failure as a value — [`LineSearchFailure`] distinguishes an
//! exhausted budget from a step that collapsed below `min_a` — leaving the
//! outer loop to decide how to react.
//!
//! # References
//!
//! - Nocedal & Wright, "Numerical Optimization" (2006), ch. 3.

use crate::{
    error::{OptimError, Result},
    objective::ObjectiveFunction,
    solver::EvalBudget,
    types::{DVector, Scalar},
};
use log::trace;
use num_traits::Float;
use std::fmt::Debug;

/// Tuning parameters shared by both line searches.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchParams<T: Scalar> {
    /// Initial trial step `a_start > 0`.
    pub a_start: T,
    /// Step scaling factor `tau ∈ (0,1)`: Backtracking multiplies the step
    /// by `tau` (shrinking it), the Armijo–Wolfe bracketing phase divides by
    /// `tau` (growing it).
    pub tau: T,
    /// Sufficient-decrease (Armijo) parameter `m1 ∈ [0,1)`.
    pub m1: T,
    /// Strong curvature parameter. A value in `(0,1)` selects the
    /// Armijo–Wolfe search; anything else selects plain Backtracking.
    pub m2: T,
    /// Interpolation safeguard fraction: a zoom trial is confined to
    /// `[a_lo + w·sfgrd, a_hi − w·sfgrd]` with `w` the bracket width.
    pub sfgrd: T,
    /// Step-collapse threshold: a step at or below `min_a` signals a
    /// stalled or non-descent direction.
    pub min_a: T,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            a_start: T::one(),
            tau: <T as Scalar>::from_f64(0.9),
            m1: <T as Scalar>::from_f64(0.01),
            m2: <T as Scalar>::from_f64(0.9),
            sfgrd: <T as Scalar>::from_f64(0.01),
            min_a: T::DEFAULT_MIN_STEP,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Validates the parameters against their recognized ranges.
    ///
    /// `m2` is deliberately unconstrained: its value only selects which
    /// search is built (see [`StepSearch::from_params`]).
    pub fn validate(&self) -> Result<()> {
        if self.a_start <= T::zero() {
            return Err(OptimError::invalid_parameter("a_start is not > 0"));
        }
        if self.tau <= T::zero() || self.tau >= T::one() {
            return Err(OptimError::invalid_parameter("tau is not in (0,1)"));
        }
        if self.m1 < T::zero() || self.m1 >= T::one() {
            return Err(OptimError::invalid_parameter("m1 is not in [0,1)"));
        }
        if self.sfgrd <= T::zero() || self.sfgrd >= <T as Scalar>::from_f64(0.5) {
            return Err(OptimError::invalid_parameter("sfgrd is not in (0,0.5)"));
        }
        if self.min_a <= T::zero() {
            return Err(OptimError::invalid_parameter("min_a is not > 0"));
        }
        Ok(())
    }
}

/// Why a line search gave up without an acceptable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearchFailure {
    /// The shared evaluation budget ran out mid-search.
    BudgetExhausted,
    /// The trial step (or bracket width) fell to `min_a` or below.
    StepCollapsed,
}

/// Result of one line search invocation.
///
/// On success `failure` is `None` and the accepted step satisfies the
/// strategy's conditions. On failure the fields hold the last trial
/// evaluated, so the caller still has a best-effort point to report.
#[derive(Debug, Clone)]
pub struct LineSearchOutcome<T: Scalar> {
    /// Accepted (or last tried) step size.
    pub step: T,
    /// Point `x + step·d`.
    pub point: DVector<T>,
    /// Objective value at `point`.
    pub value: T,
    /// Gradient at `point`.
    pub gradient: DVector<T>,
    /// Failure signal, `None` on success.
    pub failure: Option<LineSearchFailure>,
}

/// Interface shared by the step-size search strategies.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches for a step along `direction` from `x`.
    ///
    /// `value` is `f(x)` and `directional_deriv` is `g(x)·direction`, which
    /// must be negative for `direction` to be a descent direction. `a_start`
    /// is this invocation's initial trial step (the accelerated gradient
    /// feeds back the previously accepted step here). Trial evaluations are
    /// spent from `budget`.
    #[allow(clippy::too_many_arguments)]
    fn search<F>(
        &self,
        f: &F,
        x: &DVector<T>,
        direction: &DVector<T>,
        value: T,
        directional_deriv: T,
        a_start: T,
        budget: &mut EvalBudget,
    ) -> LineSearchOutcome<T>
    where
        F: ObjectiveFunction<T> + ?Sized;

    /// Human-readable strategy name, for logging.
    fn name(&self) -> &str;
}

/// Backtracking line search enforcing the Armijo condition only.
#[derive(Debug, Clone, Copy)]
pub struct BacktrackingLineSearch<T: Scalar> {
    params: LineSearchParams<T>,
}

impl<T: Scalar> BacktrackingLineSearch<T> {
    /// Creates the search after validating `params`.
    pub fn new(params: LineSearchParams<T>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The validated parameters.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch<T> {
    #[allow(clippy::too_many_arguments)]
    fn search<F>(
        &self,
        f: &F,
        x: &DVector<T>,
        direction: &DVector<T>,
        value: T,
        directional_deriv: T,
        a_start: T,
        budget: &mut EvalBudget,
    ) -> LineSearchOutcome<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        debug_assert!(directional_deriv < T::zero());
        let p = &self.params;
        let mut a = a_start;

        loop {
            if budget.exhausted() {
                return give_up(f, x, value, a, LineSearchFailure::BudgetExhausted);
            }
            budget.record();
            let point = x + direction * a;
            let trial = f.cost(&point);
            trace!("backtracking: a={:e} phi(a)={:e}", a.to_f64(), trial.to_f64());

            if trial <= value + p.m1 * a * directional_deriv {
                let gradient = f.gradient(&point);
                return LineSearchOutcome {
                    step: a,
                    point,
                    value: trial,
                    gradient,
                    failure: None,
                };
            }

            a *= p.tau;
            if a <= p.min_a {
                let gradient = f.gradient(&point);
                return LineSearchOutcome {
                    step: a,
                    point,
                    value: trial,
                    gradient,
                    failure: Some(LineSearchFailure::StepCollapsed),
                };
            }
        }
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}

/// Armijo–Wolfe line search enforcing sufficient decrease and strong
/// curvature.
///
/// The bracketing phase grows the step (dividing by `tau`) while the
/// directional derivative stays negative and the Armijo condition holds; as
/// soon as either fails the acceptable step is bracketed and the zoom phase
/// shrinks the interval by safeguarded quadratic interpolation of the two
/// endpoint derivatives. The safeguard keeps every trial at least a `sfgrd`
/// fraction of the bracket width away from both endpoints, which prevents
/// the interpolant from collapsing against an endpoint when the endpoint
/// derivatives are badly scaled.
#[derive(Debug, Clone, Copy)]
pub struct ArmijoWolfeLineSearch<T: Scalar> {
    params: LineSearchParams<T>,
}

impl<T: Scalar> ArmijoWolfeLineSearch<T> {
    /// Creates the search after validating `params`.
    ///
    /// # Errors
    ///
    /// Besides the shared parameter ranges, `m2` must lie in `(0,1)` here.
    pub fn new(params: LineSearchParams<T>) -> Result<Self> {
        params.validate()?;
        if params.m2 <= T::zero() || params.m2 >= T::one() {
            return Err(OptimError::invalid_parameter("m2 is not in (0,1)"));
        }
        Ok(Self { params })
    }

    /// The validated parameters.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }
}

impl<T: Scalar> LineSearch<T> for ArmijoWolfeLineSearch<T> {
    #[allow(clippy::too_many_arguments)]
    fn search<F>(
        &self,
        f: &F,
        x: &DVector<T>,
        direction: &DVector<T>,
        value: T,
        directional_deriv: T,
        a_start: T,
        budget: &mut EvalBudget,
    ) -> LineSearchOutcome<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        debug_assert!(directional_deriv < T::zero());
        let p = &self.params;
        let armijo = |a: T, phi: T| phi <= value + p.m1 * a * directional_deriv;
        let curvature =
            |dphi: T| <T as Float>::abs(dphi) <= -p.m2 * directional_deriv;

        // One trial evaluation: point, value and slope at x + a·d.
        let eval = |a: T, budget: &mut EvalBudget| {
            budget.record();
            let point = x + direction * a;
            let (phi, gradient) = f.cost_and_gradient(&point);
            let dphi = gradient.dot(direction);
            trace!(
                "armijo-wolfe: a={:e} phi(a)={:e} phi'(a)={:e}",
                a.to_f64(),
                phi.to_f64(),
                dphi.to_f64()
            );
            (point, phi, gradient, dphi)
        };

        // Bracketing phase: [a_lo, ·] keeps the last step satisfying Armijo
        // with a negative slope.
        let mut a_lo = T::zero();
        let mut dphi_lo = directional_deriv;
        let mut a = a_start;
        // Right endpoint, overwritten when the bracket closes.
        let mut a_hi = a_start;
        let mut dphi_hi = T::zero();
        loop {
            if budget.exhausted() {
                return give_up(f, x, value, a, LineSearchFailure::BudgetExhausted);
            }
            let (point, phi, gradient, dphi) = eval(a, budget);
            if armijo(a, phi) && curvature(dphi) {
                return LineSearchOutcome {
                    step: a,
                    point,
                    value: phi,
                    gradient,
                    failure: None,
                };
            }
            if !armijo(a, phi) || dphi >= T::zero() {
                a_hi = a;
                dphi_hi = dphi;
                break;
            }
            // Armijo holds and the slope is still negative: grow the step.
            a_lo = a;
            dphi_lo = dphi;
            a = a / p.tau;
        }

        // Zoom phase: safeguarded quadratic interpolation inside [a_lo, a_hi].
        loop {
            let width = a_hi - a_lo;
            if width <= p.min_a {
                return give_up(f, x, value, a_lo, LineSearchFailure::StepCollapsed);
            }
            if budget.exhausted() {
                return give_up(f, x, value, a_lo, LineSearchFailure::BudgetExhausted);
            }

            // Zero of the linear model of φ' through the endpoint slopes,
            // clamped into the safeguarded interior of the bracket.
            let denom = dphi_hi - dphi_lo;
            let mut a = if <T as Float>::abs(denom) > T::EPSILON {
                (a_lo * dphi_hi - a_hi * dphi_lo) / denom
            } else {
                a_lo + width * <T as Scalar>::from_f64(0.5)
            };
            let lo_guard = a_lo + width * p.sfgrd;
            let hi_guard = a_hi - width * p.sfgrd;
            a = <T as Float>::min(<T as Float>::max(a, lo_guard), hi_guard);

            let (point, phi, gradient, dphi) = eval(a, budget);
            if armijo(a, phi) && curvature(dphi) {
                return LineSearchOutcome {
                    step: a,
                    point,
                    value: phi,
                    gradient,
                    failure: None,
                };
            }
            if !armijo(a, phi) || dphi >= T::zero() {
                a_hi = a;
                dphi_hi = dphi;
            } else {
                a_lo = a;
                dphi_lo = dphi;
            }
        }
    }

    fn name(&self) -> &str {
        "ArmijoWolfe"
    }
}

/// Step-size search selected once at optimizer construction.
///
/// The variant is picked from the curvature parameter: `m2 ∈ (0,1)` selects
/// [`ArmijoWolfeLineSearch`], anything else the plain
/// [`BacktrackingLineSearch`].
#[derive(Debug, Clone, Copy)]
pub enum StepSearch<T: Scalar> {
    /// Armijo-only backtracking.
    Backtracking(BacktrackingLineSearch<T>),
    /// Armijo + strong curvature with bracketing and zoom.
    ArmijoWolfe(ArmijoWolfeLineSearch<T>),
}

impl<T: Scalar> StepSearch<T> {
    /// Builds the search variant selected by `params.m2`.
    pub fn from_params(params: LineSearchParams<T>) -> Result<Self> {
        if params.m2 > T::zero() && params.m2 < T::one() {
            Ok(Self::ArmijoWolfe(ArmijoWolfeLineSearch::new(params)?))
        } else {
            Ok(Self::Backtracking(BacktrackingLineSearch::new(params)?))
        }
    }

    /// The parameters of the selected variant.
    pub fn params(&self) -> &LineSearchParams<T> {
        match self {
            Self::Backtracking(ls) => ls.params(),
            Self::ArmijoWolfe(ls) => ls.params(),
        }
    }

    /// Delegates to the selected variant's [`LineSearch::search`].
    #[allow(clippy::too_many_arguments)]
    pub fn search<F>(
        &self,
        f: &F,
        x: &DVector<T>,
        direction: &DVector<T>,
        value: T,
        directional_deriv: T,
        a_start: T,
        budget: &mut EvalBudget,
    ) -> LineSearchOutcome<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        match self {
            Self::Backtracking(ls) => {
                ls.search(f, x, direction, value, directional_deriv, a_start, budget)
            }
            Self::ArmijoWolfe(ls) => {
                ls.search(f, x, direction, value, directional_deriv, a_start, budget)
            }
        }
    }

    /// The selected variant's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Backtracking(ls) => LineSearch::<T>::name(ls),
            Self::ArmijoWolfe(ls) => LineSearch::<T>::name(ls),
        }
    }
}

/// Failure outcome carrying the caller's point as a best effort.
fn give_up<T, F>(
    f: &F,
    x: &DVector<T>,
    value: T,
    step: T,
    failure: LineSearchFailure,
) -> LineSearchOutcome<T>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    LineSearchOutcome {
        step,
        point: x.clone(),
        value,
        gradient: f.gradient(x),
        failure: Some(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Quadratic;

    fn quadratic_setup() -> (Quadratic<f64>, DVector<f64>, f64, DVector<f64>) {
        let f = Quadratic::simple(2);
        let x = DVector::from_vec(vec![3.0, 4.0]);
        let value = f.cost(&x);
        let g = f.gradient(&x);
        (f, x, value, g)
    }

    #[test]
    fn test_backtracking_satisfies_armijo() {
        let (f, x, value, g) = quadratic_setup();
        let d = -&g;
        let dd = g.dot(&d);
        let params = LineSearchParams::default();
        let ls = BacktrackingLineSearch::new(params).unwrap();
        let mut budget = EvalBudget::new(100);

        let out = ls.search(&f, &x, &d, value, dd, params.a_start, &mut budget);
        assert!(out.failure.is_none());
        assert!(out.value <= value + params.m1 * out.step * dd);
        assert!(out.step > 0.0);
        assert!(budget.used() >= 1);
    }

    #[test]
    fn test_armijo_wolfe_satisfies_both_conditions() {
        let (f, x, value, g) = quadratic_setup();
        let d = -&g;
        let dd = g.dot(&d);
        let params = LineSearchParams {
            m1: 1e-4,
            m2: 0.9,
            ..LineSearchParams::default()
        };
        let ls = ArmijoWolfeLineSearch::new(params).unwrap();
        let mut budget = EvalBudget::new(100);

        let out = ls.search(&f, &x, &d, value, dd, params.a_start, &mut budget);
        assert!(out.failure.is_none());
        assert!(out.value <= value + params.m1 * out.step * dd);
        let dphi = out.gradient.dot(&d);
        assert!(dphi.abs() <= -params.m2 * dd);
    }

    #[test]
    fn test_budget_exhaustion_is_signalled() {
        let (f, x, value, g) = quadratic_setup();
        let d = -&g;
        let dd = g.dot(&d);
        let ls = BacktrackingLineSearch::new(LineSearchParams::default()).unwrap();
        let mut budget = EvalBudget::new(0);

        let out = ls.search(&f, &x, &d, value, dd, 1.0, &mut budget);
        assert_eq!(out.failure, Some(LineSearchFailure::BudgetExhausted));
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_step_collapse_on_ascent_direction() {
        // Along an ascent direction Armijo can never hold for a convex
        // quadratic, so the step shrinks down to min_a.
        let (f, x, value, g) = quadratic_setup();
        let d = g.clone();
        let dd = -g.dot(&d); // pretend it is a descent direction
        let params = LineSearchParams {
            min_a: 1e-8,
            tau: 0.5,
            ..LineSearchParams::default()
        };
        let ls = BacktrackingLineSearch::new(params).unwrap();
        let mut budget = EvalBudget::new(1000);

        let out = ls.search(&f, &x, &d, value, dd, 1.0, &mut budget);
        assert_eq!(out.failure, Some(LineSearchFailure::StepCollapsed));
        assert!(out.step <= params.min_a);
    }

    #[test]
    fn test_params_validation() {
        let bad = LineSearchParams::<f64> {
            tau: 1.5,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());

        let bad = LineSearchParams::<f64> {
            m1: 1.0,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());

        // m2 outside (0,1) selects backtracking rather than failing.
        let params = LineSearchParams::<f64> {
            m2: 2.0,
            ..LineSearchParams::default()
        };
        assert!(matches!(
            StepSearch::from_params(params).unwrap(),
            StepSearch::Backtracking(_)
        ));
        let params = LineSearchParams::<f64>::default();
        assert!(matches!(
            StepSearch::from_params(params).unwrap(),
            StepSearch::ArmijoWolfe(_)
        ));
    }
}
