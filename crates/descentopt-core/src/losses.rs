//! Sample objectives built from data: regression and classification losses.
//!
//! Each loss pairs a design matrix `X` (one sample per row) with a target
//! vector `y` and exposes the mean loss of the linear model `Xθ` through the
//! [`ObjectiveFunction`] contract, with an optional L1/L2 penalty weighted by
//! `lmbda` and scaled by the sample count, matching the mean-loss scale.
//!
//! These exist to exercise the solvers on realistic smooth and non-smooth
//! problems; they carry no model-fitting machinery beyond evaluation.

use crate::{
    error::{OptimError, Result},
    objective::ObjectiveFunction,
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;

/// Penalty added to a loss, scaled by `1/m` like the mean loss itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regularization<T: Scalar> {
    /// No penalty.
    None,
    /// `lmbda · Σ|θᵢ|` — non-smooth at zero; the reported gradient is a
    /// subgradient there.
    L1 {
        /// Penalty weight, `≥ 0`.
        lmbda: T,
    },
    /// `lmbda · Σθᵢ²`.
    L2 {
        /// Penalty weight, `≥ 0`.
        lmbda: T,
    },
}

impl<T: Scalar> Regularization<T> {
    fn validate(&self) -> Result<()> {
        let lmbda = match self {
            Self::None => return Ok(()),
            Self::L1 { lmbda } | Self::L2 { lmbda } => *lmbda,
        };
        if lmbda < T::zero() {
            return Err(OptimError::invalid_parameter("lmbda is not >= 0"));
        }
        Ok(())
    }

    fn penalty(&self, theta: &DVector<T>) -> T {
        match self {
            Self::None => T::zero(),
            Self::L1 { lmbda } => {
                *lmbda * theta.iter().map(|t| <T as Float>::abs(*t)).fold(T::zero(), |s, v| s + v)
            }
            Self::L2 { lmbda } => *lmbda * theta.dot(theta),
        }
    }

    fn penalty_gradient(&self, theta: &DVector<T>) -> DVector<T> {
        match self {
            Self::None => DVector::zeros(theta.len()),
            Self::L1 { lmbda } => theta.map(|t| *lmbda * <T as Float>::signum(t)),
            Self::L2 { lmbda } => theta * (*lmbda + *lmbda),
        }
    }
}

fn validate_samples<T: Scalar>(
    design: &DMatrix<T>,
    targets: &DVector<T>,
    reg: &Regularization<T>,
) -> Result<()> {
    if design.nrows() == 0 || design.ncols() == 0 {
        return Err(OptimError::invalid_parameter("empty design matrix"));
    }
    if design.nrows() != targets.len() {
        return Err(OptimError::dimension_mismatch(design.nrows(), targets.len()));
    }
    reg.validate()
}

/// Mean squared error of the linear model `Xθ`.
#[derive(Debug, Clone)]
pub struct MeanSquaredError<T: Scalar> {
    design: DMatrix<T>,
    targets: DVector<T>,
    reg: Regularization<T>,
    x_opt: Option<DVector<T>>,
    f_opt: T,
}

impl<T: Scalar> MeanSquaredError<T> {
    /// Creates the loss over `(design, targets)`.
    ///
    /// For the unregularized loss the least-squares solution is computed
    /// once here (SVD) and exposed through `x_star`/`f_star`.
    pub fn new(
        design: DMatrix<T>,
        targets: DVector<T>,
        reg: Regularization<T>,
    ) -> Result<Self> {
        validate_samples(&design, &targets, &reg)?;
        let mut loss = Self {
            design,
            targets,
            reg,
            x_opt: None,
            f_opt: <T as Float>::neg_infinity(),
        };
        if matches!(reg, Regularization::None) {
            let svd = loss.design.clone().svd(true, true);
            if let Ok(theta) = svd.solve(&loss.targets, <T as Scalar>::from_f64(1e-12)) {
                loss.f_opt = loss.cost(&theta);
                loss.x_opt = Some(theta);
            }
        }
        Ok(loss)
    }
}

impl<T: Scalar> ObjectiveFunction<T> for MeanSquaredError<T> {
    fn dimension(&self) -> usize {
        self.design.ncols()
    }

    fn cost(&self, theta: &DVector<T>) -> T {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let residual = &self.design * theta - &self.targets;
        (residual.dot(&residual) + self.reg.penalty(theta)) / m
    }

    fn gradient(&self, theta: &DVector<T>) -> DVector<T> {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let residual = &self.design * theta - &self.targets;
        let two = <T as Scalar>::from_f64(2.0);
        (self.design.transpose() * residual * two + self.reg.penalty_gradient(theta)) / m
    }

    fn x_star(&self) -> Option<DVector<T>> {
        self.x_opt.clone()
    }

    fn f_star(&self) -> T {
        self.f_opt
    }
}

/// Mean absolute error of the linear model `Xθ`.
///
/// Non-smooth wherever a residual vanishes; `gradient` returns a
/// subgradient there, which is what the bundle method consumes.
#[derive(Debug, Clone)]
pub struct MeanAbsoluteError<T: Scalar> {
    design: DMatrix<T>,
    targets: DVector<T>,
    reg: Regularization<T>,
}

impl<T: Scalar> MeanAbsoluteError<T> {
    /// Creates the loss over `(design, targets)`.
    pub fn new(
        design: DMatrix<T>,
        targets: DVector<T>,
        reg: Regularization<T>,
    ) -> Result<Self> {
        validate_samples(&design, &targets, &reg)?;
        Ok(Self {
            design,
            targets,
            reg,
        })
    }
}

impl<T: Scalar> ObjectiveFunction<T> for MeanAbsoluteError<T> {
    fn dimension(&self) -> usize {
        self.design.ncols()
    }

    fn cost(&self, theta: &DVector<T>) -> T {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let residual = &self.design * theta - &self.targets;
        let abs_sum = residual
            .iter()
            .map(|r| <T as Float>::abs(*r))
            .fold(T::zero(), |s, v| s + v);
        (abs_sum + self.reg.penalty(theta)) / m
    }

    fn gradient(&self, theta: &DVector<T>) -> DVector<T> {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let signs = (&self.design * theta - &self.targets).map(<T as Float>::signum);
        (self.design.transpose() * signs + self.reg.penalty_gradient(theta)) / m
    }
}

/// Mean cross-entropy of the sigmoid-composed linear model `σ(Xθ)`.
#[derive(Debug, Clone)]
pub struct CrossEntropy<T: Scalar> {
    design: DMatrix<T>,
    targets: DVector<T>,
    reg: Regularization<T>,
}

impl<T: Scalar> CrossEntropy<T> {
    /// Creates the loss over `(design, targets)`.
    ///
    /// Targets must lie in `[0, 1]`.
    pub fn new(
        design: DMatrix<T>,
        targets: DVector<T>,
        reg: Regularization<T>,
    ) -> Result<Self> {
        validate_samples(&design, &targets, &reg)?;
        if targets.iter().any(|y| *y < T::zero() || *y > T::one()) {
            return Err(OptimError::invalid_parameter("targets are not in [0,1]"));
        }
        Ok(Self {
            design,
            targets,
            reg,
        })
    }

    fn predict(&self, theta: &DVector<T>) -> DVector<T> {
        (&self.design * theta).map(sigmoid)
    }
}

impl<T: Scalar> ObjectiveFunction<T> for CrossEntropy<T> {
    fn dimension(&self) -> usize {
        self.design.ncols()
    }

    fn cost(&self, theta: &DVector<T>) -> T {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let probs = self.predict(theta);
        let mut total = T::zero();
        for (y, p) in self.targets.iter().zip(probs.iter()) {
            total = total + xlogy(*y, *p) + xlogy(T::one() - *y, T::one() - *p);
        }
        (-total + self.reg.penalty(theta)) / m
    }

    fn gradient(&self, theta: &DVector<T>) -> DVector<T> {
        let m = <T as Scalar>::from_usize(self.design.nrows());
        let residual = self.predict(theta) - &self.targets;
        (self.design.transpose() * residual + self.reg.penalty_gradient(theta)) / m
    }
}

fn sigmoid<T: Scalar>(t: T) -> T {
    T::one() / (T::one() + <T as Float>::exp(-t))
}

/// `x·ln(y)` with the convention that the term vanishes when `x` is zero.
fn xlogy<T: Scalar>(x: T, y: T) -> T {
    if x == T::zero() {
        T::zero()
    } else {
        x * <T as Float>::ln(<T as Float>::max(y, T::EPSILON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn random_data(m: usize, n: usize, seed: u64) -> (DMatrix<f64>, DVector<f64>) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let design = DMatrix::from_fn(m, n, |_, _| rng.gen_range(-1.0..1.0));
        let targets = DVector::from_fn(m, |_, _| rng.gen_range(-1.0..1.0));
        (design, targets)
    }

    fn finite_diff_gradient<F: ObjectiveFunction<f64>>(
        f: &F,
        theta: &DVector<f64>,
    ) -> DVector<f64> {
        let h = 1e-6;
        DVector::from_fn(theta.len(), |i, _| {
            let mut plus = theta.clone();
            let mut minus = theta.clone();
            plus[i] += h;
            minus[i] -= h;
            (f.cost(&plus) - f.cost(&minus)) / (2.0 * h)
        })
    }

    #[test]
    fn test_mse_gradient_matches_finite_differences() {
        let (design, targets) = random_data(12, 3, 7);
        let f = MeanSquaredError::new(design, targets, Regularization::L2 { lmbda: 0.1 }).unwrap();
        let theta = DVector::from_vec(vec![0.3, -0.5, 0.8]);
        let fd = finite_diff_gradient(&f, &theta);
        assert_relative_eq!(f.gradient(&theta), fd, epsilon = 1e-5);
    }

    #[test]
    fn test_mse_x_star_is_stationary() {
        let (design, targets) = random_data(20, 4, 11);
        let f = MeanSquaredError::new(design, targets, Regularization::None).unwrap();
        let theta = f.x_star().expect("least-squares solution exists");
        assert_relative_eq!(f.gradient(&theta).norm(), 0.0, epsilon = 1e-8);
        assert!(f.f_star().is_finite());
    }

    #[test]
    fn test_mae_gradient_matches_finite_differences() {
        let (design, targets) = random_data(10, 3, 3);
        let f = MeanAbsoluteError::new(design, targets, Regularization::None).unwrap();
        // A generic point: no residual is exactly zero, so the loss is
        // differentiable there.
        let theta = DVector::from_vec(vec![0.21, -0.47, 0.93]);
        let fd = finite_diff_gradient(&f, &theta);
        assert_relative_eq!(f.gradient(&theta), fd, epsilon = 1e-5);
    }

    #[test]
    fn test_cross_entropy_gradient_matches_finite_differences() {
        let mut rng = SmallRng::seed_from_u64(5);
        let design = DMatrix::from_fn(15, 3, |_, _| rng.gen_range(-1.0..1.0));
        let targets = DVector::from_fn(15, |_, _| f64::from(u8::from(rng.gen_bool(0.5))));
        let f = CrossEntropy::new(design, targets, Regularization::L2 { lmbda: 0.01 }).unwrap();
        let theta = DVector::from_vec(vec![0.4, -0.2, 0.1]);
        let fd = finite_diff_gradient(&f, &theta);
        assert_relative_eq!(f.gradient(&theta), fd, epsilon = 1e-5);
    }

    #[test]
    fn test_cross_entropy_rejects_bad_targets() {
        let design = DMatrix::<f64>::identity(2, 2);
        let targets = DVector::from_vec(vec![0.5, 1.5]);
        assert!(CrossEntropy::new(design, targets, Regularization::None).is_err());
    }

    #[test]
    fn test_negative_lmbda_rejected() {
        let (design, targets) = random_data(4, 2, 1);
        assert!(
            MeanSquaredError::new(design, targets, Regularization::L1 { lmbda: -1.0 }).is_err()
        );
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let design = DMatrix::<f64>::zeros(3, 2);
        let targets = DVector::zeros(4);
        assert!(MeanAbsoluteError::new(design, targets, Regularization::None).is_err());
    }
}
