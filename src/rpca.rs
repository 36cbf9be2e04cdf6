use enum_dispatch::enum_dispatch;
use faer::MatRef;
use problemo::Problem;
use serde::{Deserialize, Serialize};

use crate::noisy::{MuSchedule, Noisy, TemporalNorm};
use crate::pcp::Pcp;
use crate::reshape::{self, InterpolationAxis};
use crate::{Decomposition, E, I, InvalidParameter, Mask, SolverHooks, Status};

/// Policy for the anomaly channel on unobserved entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingAnomaly {
    /// `A <- D - M` on unobserved cells: the reconstruction residual is
    /// absorbed into the anomaly channel and propagates into the multiplier.
    #[default]
    Absorb,
    /// Unobserved anomalies are forced to zero.
    Zero,
}

/// Which decomposition model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Variant {
    /// Principal component pursuit (nuclear norm + sparse split).
    #[default]
    Pcp,
    /// Noisy RPCA with a factored low-rank part and optional temporal
    /// penalties; the L1/L2 penalty form comes from [`Rpca::norm`].
    Noisy,
}

/// Decomposition of NaN-free observations under an observed mask.
#[enum_dispatch]
pub trait MatrixDecomposer {
    fn decompose_observed(
        &self,
        d: MatRef<'_, E>,
        omega: &Mask,
        hooks: &mut SolverHooks,
    ) -> Result<Decomposition, Problem>;
}

/// Tagged solver variant, resolved once at facade entry so the hot loops run
/// without virtual dispatch.
#[enum_dispatch(MatrixDecomposer)]
pub enum Solver {
    Pcp(Pcp),
    Noisy(Noisy),
}

/// Configuration facade over the decomposition variants.
///
/// Optional parameters left at `None` are resolved from the scaling
/// heuristics against the warm-started observations. Callers wanting
/// standardized inputs are expected to scale them externally; the facade
/// never rescales data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rpca {
    pub variant: Variant,
    /// Number of rows of the packed matrix when the input is a 1-D signal.
    pub period: Option<I>,
    /// Noisy only: rank of the factored low-rank representation.
    pub rank: Option<I>,
    /// Noisy only: factor regularization weight.
    pub tau: Option<E>,
    /// Anomaly L1 regularization weight.
    pub lam: Option<E>,
    /// PCP only: augmented Lagrangian penalty (the noisy variants follow
    /// [`Rpca::schedule`] instead).
    pub mu: Option<E>,
    /// Noisy only: temporal lags, each smaller than the packed column count.
    pub list_periods: Vec<I>,
    /// Noisy only: nonnegative weight per temporal lag.
    pub list_etas: Vec<E>,
    /// Noisy only: temporal penalty form.
    pub norm: TemporalNorm,
    pub max_iter: I,
    pub tol: E,
    pub missing_anomaly: MissingAnomaly,
    /// Noisy only, advanced: augmented Lagrangian penalty schedule.
    pub schedule: MuSchedule,
}

impl Default for Rpca {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            period: None,
            rank: None,
            tau: None,
            lam: None,
            mu: None,
            list_periods: Vec::new(),
            list_etas: Vec::new(),
            norm: TemporalNorm::default(),
            max_iter: 10_000,
            tol: 1e-6,
            missing_anomaly: MissingAnomaly::default(),
            schedule: MuSchedule::default(),
        }
    }
}

/// Signal-shaped view of a decomposition returned by
/// [`Rpca::decompose_signal`].
#[derive(Debug, Clone)]
pub struct SignalDecomposition {
    pub low_rank: Vec<E>,
    pub anomalies: Vec<E>,
    pub status: Status,
    pub iterations: I,
}

impl Rpca {
    fn build_solver(&self) -> Solver {
        match self.variant {
            Variant::Pcp => Solver::Pcp(Pcp {
                mu: self.mu,
                lam: self.lam,
                max_iter: self.max_iter,
                tol: self.tol,
                missing_anomaly: self.missing_anomaly,
            }),
            Variant::Noisy => Solver::Noisy(Noisy {
                rank: self.rank,
                tau: self.tau,
                lam: self.lam,
                list_periods: self.list_periods.clone(),
                list_etas: self.list_etas.clone(),
                norm: self.norm,
                max_iter: self.max_iter,
                tol: self.tol,
                missing_anomaly: self.missing_anomaly,
                schedule: self.schedule,
            }),
        }
    }

    /// Decomposes a 2-D observation matrix that may hold NaN entries.
    ///
    /// The observed mask is derived from the NaN pattern, missing entries
    /// are warm-started by linear interpolation along the long axis, and the
    /// resolved variant runs on the result.
    pub fn decompose_matrix(&self, x: MatRef<'_, E>) -> Result<Decomposition, Problem> {
        self.decompose_matrix_with(x, &mut SolverHooks::none())
    }

    pub fn decompose_matrix_with(
        &self,
        x: MatRef<'_, E>,
        hooks: &mut SolverHooks,
    ) -> Result<Decomposition, Problem> {
        let omega = Mask::observed(x);

        let axis = if x.nrows() >= x.ncols() {
            InterpolationAxis::WithinColumns
        } else {
            InterpolationAxis::WithinRows
        };
        let warmed = reshape::linear_interpolation(x, axis);

        self.build_solver()
            .decompose_observed(warmed.as_ref(), &omega, hooks)
    }

    /// Decomposes a 1-D signal by packing it into a `(period, ceil(len /
    /// period))` matrix first; the outputs are unpacked back to the signal
    /// length.
    pub fn decompose_signal(&self, signal: &[E]) -> Result<SignalDecomposition, Problem> {
        self.decompose_signal_with(signal, &mut SolverHooks::none())
    }

    pub fn decompose_signal_with(
        &self,
        signal: &[E],
        hooks: &mut SolverHooks,
    ) -> Result<SignalDecomposition, Problem> {
        let period = self.period.ok_or(InvalidParameter::MissingPeriod)?;
        if period == 0 {
            Err(InvalidParameter::ZeroPeriod)?;
        }

        let packed = reshape::pack(signal, period);
        let result = self.decompose_matrix_with(packed.as_ref(), hooks)?;

        Ok(SignalDecomposition {
            low_rank: reshape::unpack(result.low_rank.as_ref(), signal.len()),
            anomalies: reshape::unpack(result.anomalies.as_ref(), signal.len()),
            status: result.status,
            iterations: result.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use faer::Mat;

    use super::*;

    #[test]
    fn test_variant_dispatch() {
        let x = Mat::from_fn(6, 6, |i, j| ((i + j) % 4) as E);

        let pcp = Rpca {
            max_iter: 50,
            ..Rpca::default()
        };
        assert!(pcp.decompose_matrix(x.as_ref()).unwrap().basis.is_none());

        let noisy = Rpca {
            variant: Variant::Noisy,
            rank: Some(2),
            max_iter: 50,
            ..Rpca::default()
        };
        assert!(noisy.decompose_matrix(x.as_ref()).unwrap().basis.is_some());
    }

    #[test]
    fn test_signal_roundtrip_shape() {
        let signal: Vec<E> = (0..48)
            .map(|t| (2.0 * std::f64::consts::PI * t as E / 12.0).sin())
            .collect();
        let config = Rpca {
            period: Some(12),
            ..Rpca::default()
        };

        let result = config.decompose_signal(&signal).unwrap();
        assert_eq!(result.low_rank.len(), signal.len());
        assert_eq!(result.anomalies.len(), signal.len());
        assert_eq!(result.status, Status::Converged);
        for (idx, value) in signal.iter().enumerate() {
            let reconstructed = result.low_rank[idx] + result.anomalies[idx];
            assert!((reconstructed - value).abs() < 1e-3);
        }
    }

    #[test]
    fn test_signal_requires_period() {
        let signal = vec![1.0, 2.0, 3.0];
        let config = Rpca::default();
        assert!(config.decompose_signal(&signal).is_err());
    }

    #[test]
    fn test_all_nan_column_completes() {
        // Tall input, so the warm start interpolates within columns and the
        // all-NaN column becomes zeros.
        let x = Mat::from_fn(10, 4, |i, j| {
            if j == 2 {
                E::NAN
            } else {
                ((i + 1) * (j + 1)) as E * 0.1
            }
        });
        let config = Rpca {
            max_iter: 200,
            ..Rpca::default()
        };

        let result = config.decompose_matrix(x.as_ref()).unwrap();
        for i in 0..10 {
            assert!(result.low_rank[(i, 2)].is_finite());
            assert!(result.anomalies[(i, 2)].is_finite());
        }
    }
}
