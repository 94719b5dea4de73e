pub type Vector<T = f64> = na::DVector<T>;
pub type Matrix<T = f64> = na::DMatrix<T>;

pub type CooMatrix<T = f64> = nas::CooMatrix<T>;
pub type CsrMatrix<T = f64> = nas::CsrMatrix<T>;

pub trait DMatrixExt {
  fn is_symmetric(&self, eps: f64) -> bool;
  fn is_spd(&self) -> bool;
}
impl DMatrixExt for Matrix {
  fn is_symmetric(&self, eps: f64) -> bool {
    self.is_square() && (self - self.transpose()).amax() <= eps
  }
  fn is_spd(&self) -> bool {
    self.is_symmetric(1e-12 * self.amax()) && na::Cholesky::new(self.clone()).is_some()
  }
}

/// $v^T A u$
pub fn bilinear_form(mat: &CsrMatrix, u: &Vector, v: &Vector) -> f64 {
  v.dot(&(mat * u))
}
pub fn quadratic_form_sparse(mat: &CsrMatrix, u: &Vector) -> f64 {
  bilinear_form(mat, u, u)
}

pub trait CsrMatrixExt {
  /// Linear combination $alpha A + beta B$ of two matrices of equal shape.
  fn lin_comb(alpha: f64, a: &Self, beta: f64, b: &Self) -> Self;
}
impl CsrMatrixExt for CsrMatrix {
  fn lin_comb(alpha: f64, a: &Self, beta: f64, b: &Self) -> Self {
    assert!(a.nrows() == b.nrows() && a.ncols() == b.ncols());
    let mut coo = CooMatrix::new(a.nrows(), a.ncols());
    for (r, c, &v) in a.triplet_iter() {
      coo.push(r, c, alpha * v);
    }
    for (r, c, &v) in b.triplet_iter() {
      coo.push(r, c, beta * v);
    }
    CsrMatrix::from(&coo)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn lin_comb_sums_patterns() {
    let mut a = CooMatrix::new(2, 2);
    a.push(0, 0, 2.0);
    a.push(1, 1, 2.0);
    let mut b = CooMatrix::new(2, 2);
    b.push(0, 0, 1.0);
    b.push(0, 1, 1.0);
    b.push(1, 0, 1.0);
    let a = CsrMatrix::from(&a);
    let b = CsrMatrix::from(&b);

    let c = Matrix::from(&CsrMatrix::lin_comb(1.0, &a, -3.0, &b));
    let expected = Matrix::from_row_slice(2, 2, &[-1.0, -3.0, -3.0, 2.0]);
    assert_eq!(c, expected);
  }

  #[test]
  fn quadratic_form_of_identity_is_squared_norm() {
    let eye = CsrMatrix::identity(3);
    let u = Vector::from_vec(vec![1.0, 2.0, 2.0]);
    approx::assert_relative_eq!(quadratic_form_sparse(&eye, &u), 9.0);
  }
}
