//! # Singular-value kernels
//!
//! Dense SVD-based building blocks for the RPCA solvers:
//! - [`svd_threshold`]: proximal operator of the nuclear norm, returned in
//!   factored form.
//! - [`approx_rank`]: heuristic rank from the singular-value energy profile.
//! - [`nuclear_norm`]: sum of singular values.
//! - [`sqrtm`]: principal square root of a symmetric positive semidefinite
//!   matrix, consumed by Fréchet-style distribution metrics downstream.
//!
//! Inputs must be free of NaN/Inf entries; non-finite input is rejected as
//! [`LinearSolverError::NonFiniteSystem`] before it reaches the
//! factorization.

use faer::{Mat, MatRef};

use crate::linalg::matrix_ops::is_finite;
use crate::linalg::solver::LinearSolverError;
use crate::{E, I};

/// Share of the singular-value mass the [`approx_rank`] heuristic captures.
pub const RANK_ENERGY_THRESHOLD: E = 0.95;

fn singular_triplet(x: MatRef<'_, E>) -> Result<(Mat<E>, Vec<E>, Mat<E>), LinearSolverError> {
    if !is_finite(x) {
        return Err(LinearSolverError::NonFiniteSystem);
    }

    let svd = x.svd().map_err(|_| LinearSolverError::SvdConvergence)?;
    let s = svd.S().column_vector();
    let values = (0..s.nrows()).map(|i| s[i]).collect();

    Ok((svd.U().to_owned(), values, svd.V().to_owned()))
}

/// Proximal operator of the nuclear norm: computes the SVD of `x`, soft
/// thresholds the singular values, and returns the pair `(U * S_hat, V^T)`
/// whose product is the thresholded matrix. Returning factors lets callers
/// form a low-rank product without reassembling when that is cheaper.
pub fn svd_threshold(
    x: MatRef<'_, E>,
    threshold: E,
) -> Result<(Mat<E>, Mat<E>), LinearSolverError> {
    let (u, values, v) = singular_triplet(x)?;
    let k = values.len();

    let left = Mat::from_fn(x.nrows(), k, |i, j| {
        u[(i, j)] * E::max(values[j] - threshold, 0.0)
    });
    let right = Mat::from_fn(k, x.ncols(), |i, j| v[(j, i)]);

    Ok((left, right))
}

/// Smallest rank whose leading singular values capture at least `threshold`
/// of the total singular-value mass. Invariant under positive rescaling of
/// `x` and under appending zero singular components.
pub fn approx_rank(x: MatRef<'_, E>, threshold: E) -> Result<I, LinearSolverError> {
    if threshold >= 1.0 {
        return Ok(x.nrows().min(x.ncols()));
    }

    let (_, values, _) = singular_triplet(x)?;
    let total: E = values.iter().sum();
    if total <= 0.0 {
        // Zero matrix; any rank describes it.
        return Ok(1);
    }

    let mut cumulative = 0.0;
    for (k, sigma) in values.iter().enumerate() {
        cumulative += sigma;
        if cumulative >= threshold * total {
            return Ok(k + 1);
        }
    }
    Ok(values.len())
}

/// Nuclear norm `sum sigma_i(x)`.
pub fn nuclear_norm(x: MatRef<'_, E>) -> Result<E, LinearSolverError> {
    let (_, values, _) = singular_triplet(x)?;
    Ok(values.iter().sum())
}

/// Principal square root of a symmetric positive semidefinite matrix.
/// Negative singular-value dust from roundoff is clamped to zero.
pub fn sqrtm(x: MatRef<'_, E>) -> Result<Mat<E>, LinearSolverError> {
    let (u, values, v) = singular_triplet(x)?;
    let k = values.len();

    let left = Mat::from_fn(x.nrows(), k, |i, j| u[(i, j)] * E::max(values[j], 0.0).sqrt());
    let right = Mat::from_fn(k, x.ncols(), |i, j| v[(j, i)]);

    Ok(&left * &right)
}
