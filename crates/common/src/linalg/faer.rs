use faer::linalg::solvers::Solve;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::nalgebra::{CsrMatrix, Vector};

#[derive(Debug, thiserror::Error)]
#[error("sparse {kind} factorization failed: {reason}")]
pub struct FactorizationError {
  kind: &'static str,
  reason: String,
}

type SparseMatrixFaer = faer::sparse::SparseRowMat<usize, f64>;

pub fn nalgebra2faer(m: CsrMatrix) -> SparseMatrixFaer {
  let nrows = m.nrows();
  let ncols = m.ncols();
  let (row_ptrs, col_indices, values) = m.disassemble();

  let symbolic =
    faer::sparse::SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptrs, None, col_indices);
  faer::sparse::SparseRowMat::new(symbolic, values)
}

fn faer_solve_to_vector(x: faer::Col<f64>) -> Vector {
  Vector::from_iterator(x.nrows(), x.iter().copied())
}

pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  /// Fails for structurally or numerically singular matrices.
  pub fn new(a: CsrMatrix) -> Result<Self, FactorizationError> {
    let a = nalgebra2faer(a);
    // faer panics on a zero pivot instead of returning an error
    let raw = catch_unwind(AssertUnwindSafe(|| a.sp_lu()))
      .map_err(|_| FactorizationError {
        kind: "LU",
        reason: String::from("zero pivot, matrix is singular"),
      })?
      .map_err(|e| FactorizationError {
        kind: "LU",
        reason: format!("{e:?}"),
      })?;
    Ok(Self { raw })
  }
  pub fn solve(&self, b: &Vector) -> Vector {
    let b = faer::Col::from_fn(b.nrows(), |i| b[i]);
    faer_solve_to_vector(self.raw.solve(b))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::linalg::nalgebra::CooMatrix;

  fn tridiag(n: usize) -> CsrMatrix {
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
      coo.push(i, i, 2.0);
      if i + 1 < n {
        coo.push(i, i + 1, -1.0);
        coo.push(i + 1, i, -1.0);
      }
    }
    CsrMatrix::from(&coo)
  }

  #[test]
  fn lu_matches_dense_solve() {
    let n = 6;
    let a = tridiag(n);
    let b = Vector::from_fn(n, |i, _| (i + 1) as f64);

    let x = FaerLu::new(a.clone()).unwrap().solve(&b);
    let x_dense = na::DMatrix::from(&a).lu().solve(&b).unwrap();

    approx::assert_relative_eq!(x, x_dense, epsilon = 1e-12);
    approx::assert_relative_eq!(&a * &x, b, epsilon = 1e-12);
  }

  #[test]
  fn singular_matrix_is_error() {
    let mut coo = CooMatrix::new(2, 2);
    for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
      coo.push(r, c, 1.0);
    }
    assert!(FaerLu::new(CsrMatrix::from(&coo)).is_err());
  }
}
