use faer::{Mat, MatRef};

use crate::{E, I};

/// Direction along which [`linear_interpolation`] fills missing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationAxis {
    /// Interpolate within each column, down the rows.
    WithinColumns,
    /// Interpolate within each row, across the columns.
    WithinRows,
}

/// Packs a 1-D signal into a `(period, ceil(len / period))` matrix in
/// row-major order, NaN-padding the tail.
pub fn pack(signal: &[E], period: I) -> Mat<E> {
    let ncols = signal.len().div_ceil(period);
    Mat::from_fn(period, ncols, |i, j| {
        signal.get(i * ncols + j).copied().unwrap_or(E::NAN)
    })
}

/// Inverse of [`pack`]: flattens in the same row-major order and trims the
/// padding back to the original signal length.
pub fn unpack(m: MatRef<'_, E>, len: I) -> Vec<E> {
    let ncols = m.ncols();
    (0..len).map(|idx| m[(idx / ncols, idx % ncols)]).collect()
}

/// Fills NaN slots of one line in place, interpolating between the nearest
/// finite neighbours; leading and trailing gaps take the nearest finite
/// value, and an all-NaN line becomes zeros.
fn interpolate_line(values: &mut [E]) {
    let finite: Vec<I> = (0..values.len())
        .filter(|&t| !values[t].is_nan())
        .collect();

    if finite.is_empty() {
        values.fill(0.0);
        return;
    }

    for t in 0..values.len() {
        if !values[t].is_nan() {
            continue;
        }
        let pos = finite.partition_point(|&idx| idx < t);
        values[t] = if pos == 0 {
            values[finite[0]]
        } else if pos == finite.len() {
            values[finite[finite.len() - 1]]
        } else {
            let (i0, i1) = (finite[pos - 1], finite[pos]);
            let weight = (t - i0) as E / (i1 - i0) as E;
            values[i0] + weight * (values[i1] - values[i0])
        };
    }
}

/// Linear interpolation of NaN entries along `axis`, used to warm-start the
/// solvers with a NaN-free observation matrix.
pub fn linear_interpolation(x: MatRef<'_, E>, axis: InterpolationAxis) -> Mat<E> {
    match axis {
        InterpolationAxis::WithinColumns => {
            let columns: Vec<Vec<E>> = (0..x.ncols())
                .map(|j| {
                    let mut line: Vec<E> = (0..x.nrows()).map(|i| x[(i, j)]).collect();
                    interpolate_line(&mut line);
                    line
                })
                .collect();
            Mat::from_fn(x.nrows(), x.ncols(), |i, j| columns[j][i])
        }
        InterpolationAxis::WithinRows => {
            let rows: Vec<Vec<E>> = (0..x.nrows())
                .map(|i| {
                    let mut line: Vec<E> = (0..x.ncols()).map(|j| x[(i, j)]).collect();
                    interpolate_line(&mut line);
                    line
                })
                .collect();
            Mat::from_fn(x.nrows(), x.ncols(), |i, j| rows[i][j])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_pads_tail() {
        let signal: Vec<E> = (0..10).map(|v| v as E).collect();
        let packed = pack(&signal, 4);
        assert_eq!(packed.nrows(), 4);
        assert_eq!(packed.ncols(), 3);
        assert_eq!(packed[(0, 0)], 0.0);
        assert_eq!(packed[(1, 0)], 3.0);
        assert_eq!(packed[(3, 0)], 9.0);
        assert!(packed[(3, 1)].is_nan());
        assert!(packed[(3, 2)].is_nan());
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let signal: Vec<E> = (0..13).map(|v| (v as E).sin()).collect();
        let packed = pack(&signal, 5);
        let restored = unpack(packed.as_ref(), signal.len());
        assert_eq!(restored, signal);
    }

    #[test]
    fn test_interpolation_interior_gap() {
        let x = Mat::from_fn(1, 5, |_, j| match j {
            1 | 2 => E::NAN,
            _ => j as E,
        });
        let filled = linear_interpolation(x.as_ref(), InterpolationAxis::WithinRows);
        assert_eq!(filled[(0, 1)], 1.0);
        assert_eq!(filled[(0, 2)], 2.0);
    }

    #[test]
    fn test_interpolation_edges_take_nearest() {
        let x = Mat::from_fn(5, 1, |i, _| match i {
            0 | 4 => E::NAN,
            _ => i as E,
        });
        let filled = linear_interpolation(x.as_ref(), InterpolationAxis::WithinColumns);
        assert_eq!(filled[(0, 0)], 1.0);
        assert_eq!(filled[(4, 0)], 3.0);
    }

    #[test]
    fn test_interpolation_all_nan_column_becomes_zero() {
        let x = Mat::from_fn(4, 3, |i, j| if j == 1 { E::NAN } else { (i + j) as E });
        let filled = linear_interpolation(x.as_ref(), InterpolationAxis::WithinColumns);
        for i in 0..4 {
            assert_eq!(filled[(i, 1)], 0.0);
        }
        assert_eq!(filled[(2, 0)], 2.0);
    }
}
