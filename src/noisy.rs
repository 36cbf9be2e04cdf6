//! # Noisy RPCA with temporal penalties
//!
//! An "improved" RPCA for time-series-like matrices: the low-rank component
//! is held in factored form `M = L * Qᵀ`, the data-fit term tolerates dense
//! noise, and optional Toeplitz-difference penalties couple columns one lag
//! apart. The temporal residual is dissipated either through an L1 norm
//! (auxiliary sparse residuals with their own multipliers) or an L2 norm
//! (folded directly into the X-update system).
//!
//! > Wang, Xuehui, et al. "An improved robust principal component analysis
//! > model for anomalies detection of subway passenger flow."
//! > Journal of Advanced Transportation (2018).
//!
//! > Chen, Yuxin, et al. "Bridging convex and nonconvex optimization in
//! > robust PCA: Noise, outliers and missing data."
//! > The Annals of Statistics 49.5 (2021).

use faer::{Mat, MatRef};
use problemo::{Problem, ProblemResult};
use serde::{Deserialize, Serialize};

use crate::callback::{CostTerms, IterationReport};
use crate::linalg::matrix_ops::{
    apply_missing_policy, is_finite, l1_norm, max_abs, soft_threshold,
};
use crate::linalg::solver::{LinearSolverError, solve};
use crate::linalg::svd::nuclear_norm;
use crate::linalg::toeplitz::toeplitz_difference;
use crate::rpca::{MatrixDecomposer, MissingAnomaly};
use crate::scaling::noisy_scale;
use crate::{
    Basis, Decomposition, E, I, InvalidParameter, Mask, ShapeMismatch, SolverFailure, SolverHooks,
    Status,
};

/// Form of the temporal dissipation penalty applied to the lagged
/// differences of the low-rank iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemporalNorm {
    /// `sum_k eta_k ||X H_k||_1`, via auxiliary sparse residuals.
    L1,
    /// `sum_k eta_k ||X H_k||_F^2 / 2`, folded into the X-update system.
    #[default]
    L2,
}

/// Schedule for the augmented Lagrangian penalty: `mu` starts at `mu_init`
/// and grows geometrically by `rho` up to `mu_max` each sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuSchedule {
    pub rho: E,
    pub mu_init: E,
    pub mu_max: E,
}

impl Default for MuSchedule {
    fn default() -> Self {
        Self {
            rho: 1.1,
            mu_init: 1e-6,
            mu_max: 1e4,
        }
    }
}

/// Noisy RPCA solver.
///
/// Unset parameters fall back to the scaling heuristics at entry: the rank
/// from the singular-value energy profile and `tau = lam = 1 / sqrt(max(m,
/// n))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Noisy {
    /// Rank of the factored low-rank representation.
    pub rank: Option<I>,
    /// Factor regularization weight (nuclear surrogate).
    pub tau: Option<E>,
    /// Anomaly L1 regularization weight.
    pub lam: Option<E>,
    /// Temporal lags, each strictly smaller than the number of columns.
    pub list_periods: Vec<I>,
    /// Nonnegative weight for each temporal lag.
    pub list_etas: Vec<E>,
    /// Temporal penalty form.
    pub norm: TemporalNorm,
    /// Iteration budget. Reaching it is not an error.
    pub max_iter: I,
    /// Convergence tolerance on the ∞-norm of per-variable increments.
    pub tol: E,
    /// Policy for the anomaly channel on unobserved entries.
    pub missing_anomaly: MissingAnomaly,
    /// Advanced: augmented Lagrangian penalty schedule.
    pub schedule: MuSchedule,
}

impl Default for Noisy {
    fn default() -> Self {
        Self {
            rank: None,
            tau: None,
            lam: None,
            list_periods: Vec::new(),
            list_etas: Vec::new(),
            norm: TemporalNorm::default(),
            max_iter: 10_000,
            tol: 1e-6,
            missing_anomaly: MissingAnomaly::Absorb,
            schedule: MuSchedule::default(),
        }
    }
}

impl Noisy {
    /// Decomposes `d` into a rank-bounded low-rank part and a sparse part.
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
        let (m, n) = (d.nrows(), d.ncols());

        let scale = noisy_scale(d.as_ref()).via(SolverFailure { iteration: 0 })?;
        let rank = self.rank.unwrap_or(scale.rank);
        let tau = self.tau.unwrap_or(scale.tau);
        let lam = self.lam.unwrap_or(scale.lam);

        let MuSchedule {
            rho,
            mu_init,
            mu_max,
        } = self.schedule;
        let mut mu = mu_init;

        // Temporal difference operators and the weighted Gram matrix, built
        // once; the X-update system itself depends on mu and is re-solved
        // every sweep.
        let h: Vec<Mat<E>> = self
            .list_periods
            .iter()
            .map(|&period| toeplitz_difference(period, n))
            .collect();
        let mut hht = Mat::<E>::zeros(n, n);
        for (&eta, h_k) in self.list_etas.iter().zip(&h) {
            let gram = h_k * h_k.transpose();
            hht += eta * &gram;
        }
        let hht_weight = match self.norm {
            TemporalNorm::L1 => 2.0,
            TemporalNorm::L2 => 1.0,
        };

        let identity_n = Mat::<E>::identity(n, n);
        let identity_r = Mat::<E>::identity(rank, rank);

        let mut x = d.clone();
        let mut a = Mat::<E>::zeros(m, n);
        let mut l = Mat::from_fn(m, rank, |_, _| 1.0);
        let mut q = Mat::from_fn(n, rank, |_, _| 1.0);
        let mut y = Mat::<E>::zeros(m, n);

        // Auxiliary temporal residuals and their multipliers (L1 only).
        let mut r_aux: Vec<Mat<E>> = Vec::new();
        let mut y_aux: Vec<Mat<E>> = Vec::new();
        if self.norm == TemporalNorm::L1 {
            for &period in &self.list_periods {
                r_aux.push(Mat::from_fn(m, n - period, |_, _| 1.0));
                y_aux.push(Mat::from_fn(m, n - period, |_, _| 1.0));
            }
        }

        let mut increments = Vec::with_capacity(self.max_iter.min(1024));
        let mut status = Status::IterationLimit;
        let mut iterations = self.max_iter;

        for iteration in 0..self.max_iter {
            let x_prev = x.clone();
            let a_prev = a.clone();
            let l_prev = l.clone();
            let q_prev = q.clone();
            let r_prev = r_aux.clone();

            // X update: ((1 + mu) I_n + c HHᵀ) Xᵀ = (D - A + mu L Qᵀ - Y + sums)ᵀ
            let factored = &l * q.transpose();
            let mut rhs = &d - &a + mu * &factored - &y;
            for (r_k, (y_k, h_k)) in r_aux.iter().zip(y_aux.iter().zip(&h)) {
                rhs += (mu * r_k - y_k) * h_k.transpose();
            }
            let system = (1.0 + mu) * &identity_n + hht_weight * &hht;
            x = solve(system.as_ref(), rhs.transpose())
                .via(SolverFailure { iteration })?
                .transpose()
                .to_owned();

            // A update with the missing-entry policy
            let thresholded = soft_threshold((&d - &x).as_ref(), lam);
            a = apply_missing_policy(
                thresholded,
                d.as_ref(),
                x.as_ref(),
                omega,
                self.missing_anomaly,
            );

            // L update: (tau I_r + mu QᵀQ) Lᵀ = ((mu X + Y) Q)ᵀ
            let weighted = mu * &x + &y;
            let gram = q.transpose() * &q;
            let gram_q = tau * &identity_r + mu * &gram;
            l = solve(gram_q.as_ref(), (&weighted * &q).transpose())
                .via(SolverFailure { iteration })?
                .transpose()
                .to_owned();

            // Q update: (tau I_r + mu LᵀL) Qᵀ = ((mu Xᵀ + Yᵀ) L)ᵀ
            let gram = l.transpose() * &l;
            let gram_l = tau * &identity_r + mu * &gram;
            q = solve(gram_l.as_ref(), (weighted.transpose() * &l).transpose())
                .via(SolverFailure { iteration })?
                .transpose()
                .to_owned();

            // Auxiliary temporal residuals (L1 only)
            for (k, r_k) in r_aux.iter_mut().enumerate() {
                let shifted = &x * &h[k] - (1.0 / mu) * &y_aux[k];
                *r_k = soft_threshold(shifted.as_ref(), self.list_etas[k] / mu);
            }

            // Multiplier updates
            let product = &l * q.transpose();
            let gap = &x - &product;
            y += mu * &gap;
            for (y_k, (r_k, h_k)) in y_aux.iter_mut().zip(r_aux.iter().zip(&h)) {
                let lagged_gap = &x * h_k - r_k;
                *y_k += mu * &lagged_gap;
            }

            mu = E::min(mu * rho, mu_max);

            // Convergence witness: largest per-variable increment
            let mut witness = max_abs((&x - &x_prev).as_ref())
                .max(max_abs((&a - &a_prev).as_ref()))
                .max(max_abs((&l - &l_prev).as_ref()))
                .max(max_abs((&q - &q_prev).as_ref()));
            for (r_k, r_k_prev) in r_aux.iter().zip(&r_prev) {
                witness = witness.max(max_abs((r_k - r_k_prev).as_ref()));
            }
            increments.push(witness);

            if let Some(observer) = hooks.observer.as_deref_mut() {
                let cost = CostTerms {
                    noise: 0.5 * (&d - &x - &a).norm_l2().powi(2),
                    nuclear: tau * nuclear_norm(x.as_ref()).via(SolverFailure { iteration })?,
                    anomalies: lam * l1_norm(a.as_ref()),
                };
                observer.call(&IterationReport {
                    iteration,
                    low_rank: x.as_ref(),
                    anomalies: a.as_ref(),
                    cost,
                    increment: witness,
                });
            }

            if witness < self.tol {
                status = Status::Converged;
                iterations = iteration + 1;
                break;
            }
        }

        // Final projection onto the factored representation guarantees a
        // rank-bounded output.
        let low_rank = &l * q.transpose();

        tracing::debug!(iterations, ?status, "noisy decomposition finished");

        Ok(Decomposition {
            low_rank,
            anomalies: a,
            basis: Some(Basis { left: l, right: q }),
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
        if self.list_periods.len() != self.list_etas.len() {
            Err(InvalidParameter::MismatchedPenaltyLists {
                periods: self.list_periods.len(),
                etas: self.list_etas.len(),
            })?;
        }
        for &period in &self.list_periods {
            if period == 0 {
                Err(InvalidParameter::ZeroPeriod)?;
            }
            if period >= d.ncols() {
                Err(InvalidParameter::PeriodOutOfRange {
                    period,
                    n_cols: d.ncols(),
                })?;
            }
        }
        if self.list_etas.iter().any(|&eta| eta < 0.0) {
            Err(InvalidParameter::NegativeEta)?;
        }
        if self.rank.is_some_and(|rank| rank == 0) {
            Err(InvalidParameter::ZeroRank)?;
        }
        if self.tau.is_some_and(|tau| tau < 0.0) || self.lam.is_some_and(|lam| lam < 0.0) {
            Err(InvalidParameter::NegativeRegularization)?;
        }
        if self.max_iter == 0 {
            Err(InvalidParameter::ZeroIterationBudget)?;
        }
        if self.tol < 0.0 {
            Err(InvalidParameter::NegativeTolerance)?;
        }
        let schedule = &self.schedule;
        if schedule.rho <= 1.0 || schedule.mu_init <= 0.0 || schedule.mu_max < schedule.mu_init {
            Err(InvalidParameter::InvalidSchedule)?;
        }
        if !is_finite(d) {
            Err(LinearSolverError::NonFiniteSystem)?;
        }
        Ok(())
    }
}

impl MatrixDecomposer for Noisy {
    fn decompose_observed(
        &self,
        d: MatRef<'_, E>,
        omega: &Mask,
        hooks: &mut SolverHooks,
    ) -> Result<Decomposition, Problem> {
        self.decompose_with(d, omega, hooks)
    }
}
