//! Core traits and types for first-order and bundle optimization methods.
//!
//! This crate defines the contracts the solver crate builds on:
//!
//! - [`objective::ObjectiveFunction`]: the single evaluation interface every
//!   solver consumes, with [`objective::Quadratic`] and the data losses in
//!   [`losses`] as concrete problems;
//! - [`line_search`]: the Backtracking and Armijo–Wolfe step-size searches;
//! - [`solver`]: the shared terminal [`solver::Status`], result shape,
//!   evaluation budget and stopping rule;
//! - [`error`]: construction-tier errors (runtime outcomes are status
//!   values, never errors);
//! - [`linalg`]: small shared numerical helpers.
//!
//! Everything is generic over [`types::Scalar`] (`f32` or `f64`) and uses
//! `nalgebra`'s dynamically-sized vectors and matrices.

pub mod error;
pub mod line_search;
pub mod linalg;
pub mod losses;
pub mod objective;
pub mod solver;
pub mod types;

/// Commonly used items, for glob import.
pub mod prelude {
    pub use crate::error::{OptimError, Result};
    pub use crate::line_search::{
        ArmijoWolfeLineSearch, BacktrackingLineSearch, LineSearch, LineSearchFailure,
        LineSearchOutcome, LineSearchParams, StepSearch,
    };
    pub use crate::losses::{CrossEntropy, MeanAbsoluteError, MeanSquaredError, Regularization};
    pub use crate::objective::{ObjectiveFunction, Quadratic};
    pub use crate::solver::{EvalBudget, OptimizeResult, Status, StoppingCriterion};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
