//! Element matrix providers of the first order Lagrangian space.

use crate::Dim;

use common::linalg::nalgebra::Matrix;

pub type ElMat = Matrix;

/// Bilinear form evaluated on a single cell.
pub trait ElMatProvider: Sync {
  /// `cell_coords` holds the vertex coordinates as columns.
  fn eval(&self, cell_coords: &Matrix) -> ElMat;
}
impl<F> ElMatProvider for F
where
  F: Fn(&Matrix) -> ElMat + Sync,
{
  fn eval(&self, cell_coords: &Matrix) -> ElMat {
    self(cell_coords)
  }
}

/// Geometry of a single simplex derived from its edge vectors.
pub struct SimplexGeometry {
  dim: Dim,
  vol: f64,
  /// Inverse of the metric tensor $G = E^T E$.
  metric_inv: Matrix,
}
impl SimplexGeometry {
  pub fn new(cell_coords: &Matrix) -> Self {
    let dim = cell_coords.ncols() - 1;
    let origin = cell_coords.column(0);
    let spanning = Matrix::from_fn(cell_coords.nrows(), dim, |r, c| {
      cell_coords[(r, c + 1)] - origin[r]
    });
    let metric = spanning.transpose() * &spanning;
    let vol = metric.determinant().sqrt() / factorial(dim) as f64;
    let metric_inv = metric
      .try_inverse()
      .unwrap_or_else(|| Matrix::zeros(dim, dim));
    Self {
      dim,
      vol,
      metric_inv,
    }
  }
  pub fn dim(&self) -> Dim {
    self.dim
  }
  pub fn vol(&self) -> f64 {
    self.vol
  }
  pub fn nvertices(&self) -> usize {
    self.dim + 1
  }
}

fn factorial(n: usize) -> usize {
  (1..=n).product()
}

/// Differentials of the barycentric coordinates on the reference simplex as columns.
pub fn ref_difbarys(dim: Dim) -> Matrix {
  let mut difs = Matrix::zeros(dim, dim + 1);
  for i in 0..dim {
    difs[(i, 0)] = -1.0;
    difs[(i, i + 1)] = 1.0;
  }
  difs
}

/// Exact element matrix of the Laplacian bilinear form $(grad u, grad v)$.
pub struct LaplaceElmat;
impl ElMatProvider for LaplaceElmat {
  fn eval(&self, cell_coords: &Matrix) -> ElMat {
    let geo = SimplexGeometry::new(cell_coords);
    let difs = ref_difbarys(geo.dim());
    geo.vol() * difs.transpose() * &geo.metric_inv * difs
  }
}

/// Exact element matrix of the mass bilinear form $(u, v)$.
pub struct MassElmat;
impl ElMatProvider for MassElmat {
  fn eval(&self, cell_coords: &Matrix) -> ElMat {
    let geo = SimplexGeometry::new(cell_coords);
    let n = geo.nvertices();
    let v = geo.vol() / ((geo.dim() + 1) * (geo.dim() + 2)) as f64;
    let mut elmat = Matrix::from_element(n, n, v);
    elmat.fill_diagonal(2.0 * v);
    elmat
  }
}

/// Mass element matrix approximated with the trapezoidal rule.
pub struct LumpedMassElmat;
impl ElMatProvider for LumpedMassElmat {
  fn eval(&self, cell_coords: &Matrix) -> ElMat {
    let geo = SimplexGeometry::new(cell_coords);
    let n = geo.nvertices();
    Matrix::from_diagonal_element(n, n, geo.vol() / n as f64)
  }
}
