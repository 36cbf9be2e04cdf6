use faer::{Mat, MatRef, unzip, zip};

use crate::rpca::MissingAnomaly;
use crate::{E, Mask};

/// Element-wise soft-thresholding `sign(x) * max(|x| - threshold, 0)`, the
/// proximal operator of the L1 norm. A zero threshold returns the input.
pub fn soft_threshold(x: MatRef<'_, E>, threshold: E) -> Mat<E> {
    let mut out = Mat::<E>::zeros(x.nrows(), x.ncols());

    zip!(x, out.as_mut()).for_each(|unzip!(x, out)| {
        *out = x.signum() * E::max(x.abs() - threshold, 0.0);
    });

    out
}

/// Entrywise L1 norm `sum |x_ij|`.
pub fn l1_norm(x: MatRef<'_, E>) -> E {
    let mut total = 0.0;

    zip!(x).for_each(|unzip!(x)| total += x.abs());

    total
}

/// Entrywise L1 norm restricted to the observed entries of `mask`.
pub fn l1_norm_observed(x: MatRef<'_, E>, mask: &Mask) -> E {
    let mut total = 0.0;
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            if mask.get(i, j) {
                total += x[(i, j)].abs();
            }
        }
    }
    total
}

/// Largest absolute entry; the ∞-norm used by the noisy convergence witness.
pub fn max_abs(x: MatRef<'_, E>) -> E {
    let mut maximum = 0.0;

    zip!(x).for_each(|unzip!(x)| maximum = E::max(maximum, x.abs()));

    maximum
}

pub fn is_finite(x: MatRef<'_, E>) -> bool {
    let mut res = true;
    zip!(x).for_each(|unzip!(x)| {
        if !x.is_finite() {
            res = false
        }
    });
    res
}

/// Applies the missing-entry policy to a thresholded anomaly candidate:
/// observed entries keep `a`, unobserved entries absorb the reconstruction
/// residual `d - x` (or stay zero under [`MissingAnomaly::Zero`]).
pub fn apply_missing_policy(
    a: Mat<E>,
    d: MatRef<'_, E>,
    x: MatRef<'_, E>,
    mask: &Mask,
    policy: MissingAnomaly,
) -> Mat<E> {
    if mask.all_observed() {
        return a;
    }
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| {
        if mask.get(i, j) {
            a[(i, j)]
        } else {
            match policy {
                MissingAnomaly::Absorb => d[(i, j)] - x[(i, j)],
                MissingAnomaly::Zero => 0.0,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_threshold() {
        let x = Mat::from_fn(2, 2, |i, j| [[3.0, -0.5], [-2.0, 0.0]][i][j]);
        let out = soft_threshold(x.as_ref(), 1.0);
        assert_eq!(out[(0, 0)], 2.0);
        assert_eq!(out[(0, 1)], 0.0);
        assert_eq!(out[(1, 0)], -1.0);
        assert_eq!(out[(1, 1)], 0.0);
    }

    #[test]
    fn test_soft_threshold_zero_is_identity() {
        let x = Mat::from_fn(3, 2, |i, j| (i as E) - (j as E) * 0.5);
        let out = soft_threshold(x.as_ref(), 0.0);
        assert_eq!(out, x);
    }

    #[test]
    fn test_l1_norm() {
        let x = Mat::from_fn(2, 2, |i, j| if (i + j) % 2 == 0 { 1.5 } else { -2.0 });
        assert_eq!(l1_norm(x.as_ref()), 7.0);
        assert_eq!(max_abs(x.as_ref()), 2.0);
    }

    #[test]
    fn test_l1_norm_observed() {
        let x = Mat::from_fn(2, 2, |_, _| 1.0);
        let mask = Mask::from_fn(2, 2, |i, j| i == j);
        assert_eq!(l1_norm_observed(x.as_ref(), &mask), 2.0);
    }

    #[test]
    fn test_is_finite() {
        let x = Mat::from_fn(2, 2, |_, _| 1.0);
        assert!(is_finite(x.as_ref()));
        let y = Mat::from_fn(2, 2, |i, j| if i == j { E::NAN } else { 0.0 });
        assert!(!is_finite(y.as_ref()));
    }

    #[test]
    fn test_apply_missing_policy() {
        let d = Mat::from_fn(2, 2, |i, j| (i + 2 * j) as E);
        let x = Mat::<E>::zeros(2, 2);
        let a = Mat::from_fn(2, 2, |_, _| 9.0);
        let mask = Mask::from_fn(2, 2, |i, _| i == 0);

        let absorbed = apply_missing_policy(
            a.clone(),
            d.as_ref(),
            x.as_ref(),
            &mask,
            MissingAnomaly::Absorb,
        );
        assert_eq!(absorbed[(0, 1)], 9.0);
        assert_eq!(absorbed[(1, 1)], d[(1, 1)]);

        let zeroed = apply_missing_policy(a, d.as_ref(), x.as_ref(), &mask, MissingAnomaly::Zero);
        assert_eq!(zeroed[(1, 0)], 0.0);
        assert_eq!(zeroed[(0, 0)], 9.0);
    }
}
