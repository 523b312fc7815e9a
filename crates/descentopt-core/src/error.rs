//! Error types for solver construction and problem assembly.
//!
//! Only *configuration* problems are reported through these types: an
//! out-of-range parameter, a dimension mismatch, a matrix that cannot be
//! factorized. Runtime outcomes of an optimization run ("did not converge",
//! "step collapsed") are not errors; they are carried by the terminal
//! [`Status`](crate::solver::Status) value instead.

use thiserror::Error;

/// Errors raised while building an objective or configuring a solver.
#[derive(Debug, Clone, Error)]
pub enum OptimError {
    /// A scalar parameter is outside its recognized range.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the violated constraint
        reason: String,
    },

    /// Problem data with incompatible dimensions.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// A numerical precondition failed during construction.
    ///
    /// Raised when problem data cannot be prepared for iteration, e.g. a
    /// coefficient matrix that is not symmetric or cannot be factorized.
    #[error("numerical error: {reason}")]
    Numerical {
        /// Description of the numerical issue
        reason: String,
    },
}

impl OptimError {
    /// Create an `InvalidParameter` error with a custom reason.
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Create a `DimensionMismatch` error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a `Numerical` error with a custom reason.
    pub fn numerical<S: Into<String>>(reason: S) -> Self {
        Self::Numerical {
            reason: reason.into(),
        }
    }
}

/// Convenient result alias for fallible construction.
pub type Result<T> = std::result::Result<T, OptimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = OptimError::invalid_parameter("tau is not in (0,1)");
        assert_eq!(e.to_string(), "invalid parameter: tau is not in (0,1)");

        let e = OptimError::dimension_mismatch("4", "3");
        assert_eq!(e.to_string(), "dimension mismatch: expected 4, got 3");
    }
}
