//! Small shared linear-algebra helpers.
//!
//! These support the Lagrangian relaxation (positive-definite repair of a
//! symmetric coefficient matrix) and the bundle master solver (Euclidean
//! projection onto the unit simplex).

use crate::types::{DMatrix, DVector, Scalar};
use num_traits::Float;
use std::cmp::Ordering;

/// Nearest positive-definite repair of a symmetric matrix.
///
/// Symmetrizes the input and clamps every eigenvalue to at least `min_eig`,
/// then reassembles. For an already positive-definite matrix (with smallest
/// eigenvalue above `min_eig`) this is the identity up to round-off.
pub fn nearest_posdef<T: Scalar>(m: &DMatrix<T>, min_eig: T) -> DMatrix<T> {
    let half = <T as Scalar>::from_f64(0.5);
    let sym = (m + m.transpose()) * half;
    let eig = sym.symmetric_eigen();
    let clamped = eig.eigenvalues.map(|l| <T as Float>::max(l, min_eig));
    &eig.eigenvectors * DMatrix::from_diagonal(&clamped) * eig.eigenvectors.transpose()
}

/// Euclidean projection of `v` onto the unit simplex `{θ ≥ 0, Σθ = 1}`.
///
/// Sort-based algorithm (Held, Wolfe & Crowder): find the threshold `t` such
/// that `Σ max(vᵢ − t, 0) = 1` from the sorted prefix sums.
pub fn project_simplex<T: Scalar>(v: &DVector<T>) -> DVector<T> {
    let mut sorted: Vec<T> = v.iter().copied().collect();
    sorted.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let mut cumulative = T::zero();
    let mut threshold = T::zero();
    for (i, ui) in sorted.iter().enumerate() {
        cumulative = cumulative + *ui;
        let t = (cumulative - T::one()) / <T as Scalar>::from_usize(i + 1);
        if *ui - t > T::zero() {
            threshold = t;
        }
    }
    v.map(|x| <T as Float>::max(x - threshold, T::zero()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest_posdef_repairs_indefinite() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]); // eigenvalues 3, -1
        let repaired = nearest_posdef(&m, 1e-8);
        assert!(repaired.clone().cholesky().is_some());
        // Symmetry is preserved.
        assert_relative_eq!(repaired[(0, 1)], repaired[(1, 0)], epsilon = 1e-12);
    }

    #[test]
    fn test_nearest_posdef_keeps_posdef_input() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let repaired = nearest_posdef(&m, 1e-8);
        assert_relative_eq!(repaired, m, epsilon = 1e-10);
    }

    #[test]
    fn test_project_simplex_properties() {
        let v = DVector::from_vec(vec![0.5, -1.0, 2.0]);
        let p = project_simplex(&v);
        assert!(p.iter().all(|x| *x >= 0.0));
        assert_relative_eq!(p.sum(), 1.0, epsilon = 1e-12);

        // A simplex point projects to itself.
        let v = DVector::from_vec(vec![0.2, 0.3, 0.5]);
        assert_relative_eq!(project_simplex(&v), v, epsilon = 1e-12);
    }
}
