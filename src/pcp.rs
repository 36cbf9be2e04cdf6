//! # Principal Component Pursuit
//!
//! Classic RPCA decomposition `D = M + A` via an augmented Lagrangian ADMM:
//! the low-rank part `M` is updated through singular-value thresholding, the
//! sparse part `A` through soft-thresholding, and a multiplier matrix
//! enforces the reconstruction constraint on the observed entries.
//!
//! > Candès, Emmanuel J., et al. "Robust principal component analysis."
//! > Journal of the ACM 58.3 (2011).

use faer::{Mat, MatRef};
use problemo::{Problem, ProblemResult};
use serde::{Deserialize, Serialize};

use crate::callback::{CostTerms, IterationReport};
use crate::linalg::matrix_ops::{
    apply_missing_policy, is_finite, l1_norm, l1_norm_observed, soft_threshold,
};
use crate::linalg::solver::LinearSolverError;
use crate::linalg::svd::{nuclear_norm, svd_threshold};
use crate::rpca::{MatrixDecomposer, MissingAnomaly};
use crate::scaling::pcp_scale;
use crate::{
    Decomposition, E, I, InvalidParameter, Mask, ShapeMismatch, SolverFailure, SolverHooks, Status,
};

/// Margin above the initial cost beyond which the post-check emits a
/// non-fatal diagnostic.
const COST_INCREASE_TOLERANCE: E = 1e-2;

/// Principal component pursuit solver.
///
/// Unset parameters fall back to the scaling heuristics at entry:
/// `mu = m * n / (4 * ||D||_1)` and `lam = 1 / sqrt(max(m, n))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pcp {
    /// Augmented Lagrangian penalty; also sets both shrinkage thresholds.
    pub mu: Option<E>,
    /// Anomaly L1 regularization weight.
    pub lam: Option<E>,
    /// Iteration budget. Reaching it is not an error.
    pub max_iter: I,
    /// Convergence tolerance on the relative Frobenius residual
    /// `||D - M - A||_F / ||D||_F`.
    pub tol: E,
    /// Policy for the anomaly channel on unobserved entries.
    pub missing_anomaly: MissingAnomaly,
}

impl Default for Pcp {
    fn default() -> Self {
        Self {
            mu: None,
            lam: None,
            max_iter: 10_000,
            tol: 1e-6,
            missing_anomaly: MissingAnomaly::Absorb,
        }
    }
}

impl Pcp {
    /// Decomposes `d` into a low-rank and a sparse part.
    ///
    /// `d` must be NaN-free (the facade warm-starts missing entries before
    /// calling in here); `omega` marks which entries were actually observed.
    pub fn decompose(&self, d: MatRef<'_, E>, omega: &Mask) -> Result<Decomposition, Problem> {
        self.decompose_with(d, omega, &mut SolverHooks::none())
    }

    pub fn decompose_with(
        &self,
        d: MatRef<'_, E>,
        omega: &Mask,
        hooks: &mut SolverHooks,
    ) -> Result<Decomposition, Problem> {
        self.validate(d, omega)?;

        let d = d.to_owned();
        let (nrows, ncols) = (d.nrows(), d.ncols());

        let scale = pcp_scale(d.as_ref());
        let mu = self.mu.unwrap_or(scale.mu);
        let lam = self.lam.unwrap_or(scale.lam);

        let norm_d = d.norm_l2().max(E::EPSILON);

        let mut low_rank = d.clone();
        let mut anomalies = Mat::<E>::zeros(nrows, ncols);
        let mut multiplier = Mat::<E>::zeros(nrows, ncols);

        let mut increments = Vec::with_capacity(self.max_iter.min(1024));
        let mut status = Status::IterationLimit;
        let mut iterations = self.max_iter;

        for iteration in 0..self.max_iter {
            let (left, right) = svd_threshold(
                (&d - &anomalies + (1.0 / mu) * &multiplier).as_ref(),
                1.0 / mu,
            )
            .via(SolverFailure { iteration })?;
            low_rank = &left * &right;

            let thresholded = soft_threshold(
                (&d - &low_rank + (1.0 / mu) * &multiplier).as_ref(),
                lam / mu,
            );
            anomalies = apply_missing_policy(
                thresholded,
                d.as_ref(),
                low_rank.as_ref(),
                omega,
                self.missing_anomaly,
            );

            let residual = &d - &low_rank - &anomalies;
            multiplier += mu * &residual;

            let err = residual.norm_l2() / norm_d;
            increments.push(err);

            if let Some(observer) = hooks.observer.as_deref_mut() {
                let cost = CostTerms {
                    noise: 0.5 * residual.norm_l2().powi(2),
                    nuclear: nuclear_norm(low_rank.as_ref()).via(SolverFailure { iteration })?,
                    anomalies: lam * l1_norm(anomalies.as_ref()),
                };
                observer.call(&IterationReport {
                    iteration,
                    low_rank: low_rank.as_ref(),
                    anomalies: anomalies.as_ref(),
                    cost,
                    increment: err,
                });
            }

            if err < self.tol {
                status = Status::Converged;
                iterations = iteration + 1;
                break;
            }
        }

        self.check_cost_decreased(d.as_ref(), low_rank.as_ref(), anomalies.as_ref(), omega, lam)?;

        tracing::debug!(iterations, ?status, "pcp decomposition finished");

        Ok(Decomposition {
            low_rank,
            anomalies,
            basis: None,
            status,
            iterations,
            increments,
        })
    }

    fn validate(&self, d: MatRef<'_, E>, omega: &Mask) -> Result<(), Problem> {
        if d.nrows() != omega.nrows() || d.ncols() != omega.ncols() {
            Err(ShapeMismatch {
                d_rows: d.nrows(),
                d_cols: d.ncols(),
                mask_rows: omega.nrows(),
                mask_cols: omega.ncols(),
            })?;
        }
        if self.max_iter == 0 {
            Err(InvalidParameter::ZeroIterationBudget)?;
        }
        if self.tol < 0.0 {
            Err(InvalidParameter::NegativeTolerance)?;
        }
        if self.mu.is_some_and(|mu| mu <= 0.0) {
            Err(InvalidParameter::NonPositiveMu)?;
        }
        if self.lam.is_some_and(|lam| lam < 0.0) {
            Err(InvalidParameter::NegativeRegularization)?;
        }
        if !is_finite(d) {
            Err(LinearSolverError::NonFiniteSystem)?;
        }
        Ok(())
    }

    /// Post-check that `||M||_* + lam ||A||_1` (anomalies restricted to the
    /// observed set) did not end up above `||D||_*`. Informational only: a
    /// regression is reported through `tracing`, never raised.
    fn check_cost_decreased(
        &self,
        d: MatRef<'_, E>,
        low_rank: MatRef<'_, E>,
        anomalies: MatRef<'_, E>,
        omega: &Mask,
        lam: E,
    ) -> Result<(), Problem> {
        let cost_start = nuclear_norm(d).via(SolverFailure {
            iteration: self.max_iter,
        })?;
        let cost_end = nuclear_norm(low_rank).via(SolverFailure {
            iteration: self.max_iter,
        })? + lam * l1_norm_observed(anomalies, omega);

        if cost_end - cost_start > COST_INCREASE_TOLERANCE {
            tracing::warn!(
                cost_start,
                cost_end,
                "pcp may provide bad results: ||M||_* + lam ||A||_1 increased over ||D||_*",
            );
        }
        Ok(())
    }
}

impl MatrixDecomposer for Pcp {
    fn decompose_observed(
        &self,
        d: MatRef<'_, E>,
        omega: &Mask,
        hooks: &mut SolverHooks,
    ) -> Result<Decomposition, Problem> {
        self.decompose_with(d, omega, hooks)
    }
}
