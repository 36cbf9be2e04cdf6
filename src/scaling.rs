use faer::MatRef;

use crate::linalg::matrix_ops::l1_norm;
use crate::linalg::solver::LinearSolverError;
use crate::linalg::svd::{RANK_ENERGY_THRESHOLD, approx_rank};
use crate::{E, I};

/// Heuristic PCP parameters derived from the input shape and magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcpScale {
    pub mu: E,
    pub lam: E,
}

/// `mu = m * n / (4 * ||D||_1)` and `lam = 1 / sqrt(max(m, n))`, used when
/// the caller leaves the corresponding parameters unset.
pub fn pcp_scale(d: MatRef<'_, E>) -> PcpScale {
    let (m, n) = (d.nrows(), d.ncols());
    // An all-zero (fully imputed) input would otherwise send mu to infinity.
    let mass = l1_norm(d).max(E::EPSILON);

    PcpScale {
        mu: (m * n) as E / (4.0 * mass),
        lam: 1.0 / (m.max(n) as E).sqrt(),
    }
}

/// Heuristic noisy-RPCA parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisyScale {
    pub rank: I,
    pub tau: E,
    pub lam: E,
}

/// `rank` from the singular-value energy profile, `tau = lam = 1 /
/// sqrt(max(m, n))`.
pub fn noisy_scale(d: MatRef<'_, E>) -> Result<NoisyScale, LinearSolverError> {
    let rank = approx_rank(d, RANK_ENERGY_THRESHOLD)?;
    let tau = 1.0 / (d.nrows().max(d.ncols()) as E).sqrt();

    Ok(NoisyScale {
        rank,
        tau,
        lam: tau,
    })
}

#[cfg(test)]
mod tests {
    use faer::Mat;

    use super::*;

    #[test]
    fn test_pcp_scale() {
        let d = Mat::from_fn(4, 4, |_, _| 2.0);
        let scale = pcp_scale(d.as_ref());
        assert!((scale.mu - 16.0 / (4.0 * 32.0)).abs() < 1e-12);
        assert!((scale.lam - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pcp_scale_zero_input_is_finite() {
        let d = Mat::<E>::zeros(3, 5);
        let scale = pcp_scale(d.as_ref());
        assert!(scale.mu.is_finite());
    }

    #[test]
    fn test_noisy_scale() {
        // Rank-1 matrix: the energy heuristic settles on rank 1.
        let d = Mat::from_fn(4, 9, |i, j| ((i + 1) * (j + 1)) as E);
        let scale = noisy_scale(d.as_ref()).unwrap();
        assert_eq!(scale.rank, 1);
        assert!((scale.tau - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(scale.tau, scale.lam);
    }
}
