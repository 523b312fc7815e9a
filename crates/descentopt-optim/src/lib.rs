//! First-order and bundle optimization algorithms.
//!
//! Four solvers built on the `descentopt-core` contracts:
//!
//! - [`steepest::SteepestDescent`]: the base line-search iteration
//!   (steepest descent with Backtracking or Armijo–Wolfe step sizes);
//! - [`accelerated::AcceleratedGradient`]: momentum method with four
//!   selectable extrapolation formulas and a monotone variant;
//! - [`bundle::ProximalBundle`]: cutting-plane bundle method, delegating
//!   each iteration's step to a pluggable [`master::MasterSolver`];
//! - [`lagrangian::LagrangianBoxRelaxation`]: the dual of a box-constrained
//!   quadratic program as an objective with a cached factorization, to be
//!   consumed by the solvers above.
//!
//! All solvers validate their configuration eagerly at construction and
//! report runtime outcomes through the shared terminal
//! [`Status`](descentopt_core::solver::Status) — `optimal`, `unbounded`,
//! `stopped` or `error` — never through panics.

pub mod accelerated;
pub mod bundle;
pub mod lagrangian;
pub mod master;
pub mod steepest;

/// Commonly used items, for glob import.
pub mod prelude {
    pub use crate::accelerated::{
        AcceleratedGradient, AcceleratedGradientConfig, MomentumFormula,
    };
    pub use crate::bundle::{Bundle, Cut, ProximalBundle, ProximalBundleConfig};
    pub use crate::lagrangian::LagrangianBoxRelaxation;
    pub use crate::master::{MasterSolution, MasterSolver, SimplexDualSolver};
    pub use crate::steepest::{SteepestDescent, SteepestDescentConfig};
    pub use descentopt_core::prelude::*;
}
