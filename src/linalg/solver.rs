use derive_more::{Display, Error};
use faer::linalg::solvers::Solve;
use faer::{Mat, MatRef};

use crate::E;
use crate::linalg::matrix_ops::{is_finite, max_abs};

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum LinearSolverError {
    #[display("Non-finite values in linear system")]
    NonFiniteSystem,

    #[display("Singular linear system")]
    SingularSystem,

    #[display("SVD failed to converge")]
    SvdConvergence,
}

/// Solves the dense system `A X = B` for a square `A` via partially pivoted
/// LU. Tolerates symmetric positive definite input but does not assume it;
/// numerically singular pivots are rejected rather than back-substituted.
pub fn solve(a: MatRef<'_, E>, b: MatRef<'_, E>) -> Result<Mat<E>, LinearSolverError> {
    if !is_finite(a) || !is_finite(b) {
        return Err(LinearSolverError::NonFiniteSystem);
    }

    let lu = a.partial_piv_lu();

    let pivot_floor = E::EPSILON * max_abs(a).max(1.0) * a.ncols() as E;
    let u = lu.U();
    for i in 0..u.ncols().min(u.nrows()) {
        if u[(i, i)].abs() <= pivot_floor {
            return Err(LinearSolverError::SingularSystem);
        }
    }

    Ok(lu.solve(b))
}
