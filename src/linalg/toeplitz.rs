use faer::{Mat, MatRef};

use crate::{E, I};

/// Builds the `(size, size - period)` lag-`period` difference operator.
///
/// Column `j` carries `+1` at row `j` and `-1` at row `j + period`, so for a
/// matrix `X` with `size` columns the product `X * H` stacks the lag-`period`
/// column differences `X[:, j] - X[:, j + period]`.
///
/// Callers must ensure `0 < period < size`.
pub fn toeplitz_difference(period: I, size: I) -> Mat<E> {
    Mat::from_fn(size, size - period, |i, j| {
        if i == j {
            1.0
        } else if i == j + period {
            -1.0
        } else {
            0.0
        }
    })
}

/// Lag-`period` column differences of `x`, where `h` was built by
/// [`toeplitz_difference`] for `x.ncols()`.
pub fn lag_difference(x: MatRef<'_, E>, h: MatRef<'_, E>) -> Mat<E> {
    x * h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toeplitz_shape_and_entries() {
        let h = toeplitz_difference(3, 8);
        assert_eq!(h.nrows(), 8);
        assert_eq!(h.ncols(), 5);

        for j in 0..h.ncols() {
            let mut plus = 0;
            let mut minus = 0;
            let mut other = 0;
            for i in 0..h.nrows() {
                match h[(i, j)] {
                    v if v == 1.0 => plus += 1,
                    v if v == -1.0 => minus += 1,
                    v if v == 0.0 => {}
                    _ => other += 1,
                }
            }
            assert_eq!((plus, minus, other), (1, 1, 0));
            assert_eq!(h[(j, j)], 1.0);
            assert_eq!(h[(j + 3, j)], -1.0);
        }
    }

    #[test]
    fn test_lag_difference() {
        let n = 6;
        let period = 2;
        let x = Mat::from_fn(2, n, |i, j| (j * j + i) as E);
        let h = toeplitz_difference(period, n);

        let diff = lag_difference(x.as_ref(), h.as_ref());
        assert_eq!(diff.nrows(), 2);
        assert_eq!(diff.ncols(), n - period);
        for j in 0..n - period {
            for i in 0..2 {
                assert_eq!(diff[(i, j)], x[(i, j)] - x[(i, j + period)]);
            }
        }
    }
}
