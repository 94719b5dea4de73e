//! Eigen engines solving the restricted generalized problem.

pub mod krylov_schur;
pub mod slepc;

pub use krylov_schur::KrylovSchur;
pub use slepc::SlepcProcess;

use crate::{
  error::{EvpError, Result},
  options::EngineConfig,
};

use common::linalg::nalgebra::{CsrMatrix, Vector};
use std::{fmt, rc::Rc};

pub type Complex = na::Complex<f64>;

/// Diagnostics of a finished solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
  pub method: String,
  /// Outer iterations (restarts), if the engine reports them.
  pub iterations: Option<usize>,
  pub nconv: usize,
  pub nev: usize,
  pub ncv: usize,
  pub tol: f64,
  pub max_it: usize,
}
impl fmt::Display for SolveReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "method={}, tol={:.4e}, max_it={}, converged/requested={}/{}",
      self.method, self.tol, self.max_it, self.nconv, self.nev
    )?;
    if let Some(its) = self.iterations {
      write!(f, " with {its} iterations")?;
    }
    Ok(())
  }
}

/// Capabilities the session requires from an eigen engine.
///
/// Operators are set once, `solve` may be called repeatedly and `eigenpair` copies the
/// `i`-th converged pair of the last solve into the supplied buffers.
pub trait EigenEngine {
  fn method(&self) -> &str;

  fn set_operators(&mut self, stiffness: Rc<CsrMatrix>, mass: Rc<CsrMatrix>) -> Result<()>;

  fn solve(&mut self, config: &EngineConfig) -> Result<SolveReport>;

  /// Number of converged eigenpairs of the last solve, zero before the first.
  fn nconv(&self) -> usize;

  /// Fails with [`crate::EvpError::OutOfRange`] for `i >= nconv`.
  fn eigenpair(&self, i: usize, real: &mut Vector, imag: &mut Vector) -> Result<Complex>;
}

/// Both operators must be square and of equal size.
pub(crate) fn check_operators(stiffness: &CsrMatrix, mass: &CsrMatrix) -> Result<()> {
  let n = stiffness.nrows();
  for (got, what) in [
    (stiffness.ncols(), "stiffness columns"),
    (mass.nrows(), "mass rows"),
    (mass.ncols(), "mass columns"),
  ] {
    if got != n {
      return Err(EvpError::ShapeMismatch {
        what,
        expected: n,
        got,
      });
    }
  }
  Ok(())
}

/// Converged eigenpairs kept by an engine after a solve.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConvergedPairs {
  pub eigenvals: Vec<f64>,
  pub eigenvecs: Vec<Vector>,
}
impl ConvergedPairs {
  pub fn len(&self) -> usize {
    self.eigenvals.len()
  }

  pub fn copy_pair(&self, i: usize, real: &mut Vector, imag: &mut Vector) -> Result<Complex> {
    let nconv = self.len();
    let eigenvec = self.eigenvecs.get(i).ok_or(EvpError::OutOfRange {
      index: i,
      bound: nconv,
    })?;
    crate::error::check_len("eigenvector buffer", eigenvec.len(), real.len())?;
    crate::error::check_len("eigenvector buffer", eigenvec.len(), imag.len())?;
    real.copy_from(eigenvec);
    imag.fill(0.0);
    Ok(Complex::new(self.eigenvals[i], 0.0))
  }
}
