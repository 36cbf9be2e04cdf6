use derive_more::{Display, Error};
use faer::{Mat, MatRef};

pub type E = f64;
pub type I = usize;

pub mod callback;
pub mod linalg;
pub mod noisy;
pub mod pcp;
pub mod reshape;
pub mod rpca;
pub mod scaling;

#[cfg(test)]
pub mod tests;

pub use crate::rpca::{MissingAnomaly, Rpca, SignalDecomposition, Variant};

/// Status codes for the decomposition solvers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Status {
    #[default]
    /// The solver is still running.
    InProgress,
    /// The convergence tolerance was met.
    Converged,
    /// The iteration budget was exhausted before the tolerance was met.
    /// The returned iterate is the best one available; this is not an error.
    IterationLimit,
}

/// Boolean mask of observed entries.
///
/// Built once from the raw observations (`true` wherever the entry is not
/// NaN) and never mutated afterwards; solvers only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    nrows: I,
    ncols: I,
    data: Vec<bool>,
}

impl Mask {
    /// Marks every non-NaN entry of `d` as observed.
    pub fn observed(d: MatRef<'_, E>) -> Self {
        Self::from_fn(d.nrows(), d.ncols(), |i, j| !d[(i, j)].is_nan())
    }

    /// A fully observed mask.
    pub fn full(nrows: I, ncols: I) -> Self {
        Self::from_fn(nrows, ncols, |_, _| true)
    }

    pub fn from_fn(nrows: I, ncols: I, f: impl Fn(I, I) -> bool) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { nrows, ncols, data }
    }

    pub fn nrows(&self) -> I {
        self.nrows
    }

    pub fn ncols(&self) -> I {
        self.ncols
    }

    pub fn get(&self, i: I, j: I) -> bool {
        self.data[j * self.nrows + i]
    }

    pub fn all_observed(&self) -> bool {
        self.data.iter().all(|&observed| observed)
    }
}

/// Result of a robust PCA decomposition.
///
/// `low_rank + anomalies` reconstructs the (warm-started) observations on the
/// observed set; unobserved entries are driven by the low-rank model.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// Low-rank component, same shape as the observations.
    pub low_rank: Mat<E>,
    /// Sparse anomaly component, same shape as the observations.
    pub anomalies: Mat<E>,
    /// Basis factors with `low_rank = left * rightᵀ` (noisy solvers only).
    pub basis: Option<Basis>,
    /// Final solver status.
    pub status: Status,
    /// Number of ADMM sweeps performed.
    pub iterations: I,
    /// Per-iteration convergence witness (relative Frobenius residual for
    /// PCP, ∞-norm of per-variable increments for the noisy solvers).
    pub increments: Vec<E>,
}

/// Low-rank basis factors of a noisy decomposition.
#[derive(Debug, Clone)]
pub struct Basis {
    /// Left factor, `(m, rank)`.
    pub left: Mat<E>,
    /// Right factor, `(n, rank)`.
    pub right: Mat<E>,
}

/// Parameter validation errors, raised before any iteration runs.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum InvalidParameter {
    #[display("period {period} must be smaller than the number of columns {n_cols}")]
    PeriodOutOfRange { period: I, n_cols: I },

    #[display("periods must be positive")]
    ZeroPeriod,

    #[display("{periods} temporal periods but {etas} temporal weights")]
    MismatchedPenaltyLists { periods: I, etas: I },

    #[display("temporal weights must be nonnegative")]
    NegativeEta,

    #[display("rank must be positive")]
    ZeroRank,

    #[display("regularization parameters must be nonnegative")]
    NegativeRegularization,

    #[display("the penalty parameter mu must be positive")]
    NonPositiveMu,

    #[display("the iteration budget must be positive")]
    ZeroIterationBudget,

    #[display("the convergence tolerance must be nonnegative")]
    NegativeTolerance,

    #[display("the mu schedule requires rho > 1 and 0 < mu_init <= mu_max")]
    InvalidSchedule,

    #[display("a period is required to pack a 1-D signal")]
    MissingPeriod,
}

/// Raised when the observation matrix and its mask disagree on shape.
#[derive(Debug, Display, Error, PartialEq, Eq)]
#[display("observations are {d_rows}x{d_cols} but the mask is {mask_rows}x{mask_cols}")]
pub struct ShapeMismatch {
    pub d_rows: I,
    pub d_cols: I,
    pub mask_rows: I,
    pub mask_cols: I,
}

/// Context attached to numeric failures raised inside an ADMM loop, so the
/// failing iteration is visible to the caller.
#[derive(Debug, Display, Error, PartialEq, Eq)]
#[display("numeric failure at iteration {iteration}")]
pub struct SolverFailure {
    pub iteration: I,
}

/// Per-call hooks for observing solver progress.
///
/// When no observer is installed the solvers skip the per-iteration cost
/// decomposition, which needs an extra SVD per sweep.
#[derive(Default)]
pub struct SolverHooks {
    pub observer: Option<Box<dyn crate::callback::Callback>>,
}

impl SolverHooks {
    pub fn none() -> Self {
        Self { observer: None }
    }

    pub fn with_observer(observer: Box<dyn crate::callback::Callback>) -> Self {
        Self {
            observer: Some(observer),
        }
    }
}

#[cfg(test)]
mod mask_tests {
    use super::*;

    #[test]
    fn test_mask_observed() {
        let d = Mat::from_fn(2, 3, |i, j| if i == 1 && j == 2 { E::NAN } else { 1.0 });
        let mask = Mask::observed(d.as_ref());
        assert_eq!(mask.nrows(), 2);
        assert_eq!(mask.ncols(), 3);
        assert!(!mask.get(1, 2));
        assert!(mask.get(0, 0));
        assert!(!mask.all_observed());
        assert!(Mask::full(2, 3).all_observed());
    }
}
