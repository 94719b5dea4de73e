//! Default engine: Krylov-Schur iteration on the shift-and-invert operator.
//!
//! For the symmetric-definite pencil $(K, M)$ the operator $Op = (K - sigma M)^(-1) M$ is
//! self-adjoint in the $M$ inner product, so the Krylov-Schur decomposition
//! $Op V_k = V_k S_k + v_(k+1) b^T$ keeps a symmetric $S_k$ and the eigenvalues closest to
//! $sigma$ are those with largest $|theta|$, $lambda = sigma + 1 / theta$.
//! The factorization of the shifted matrix is done by sparse LU.

use super::{check_operators, Complex, ConvergedPairs, EigenEngine, SolveReport};
use crate::{
  error::{EvpError, Result},
  options::EngineConfig,
};

use common::linalg::{
  faer::FaerLu,
  nalgebra::{quadratic_form_sparse, CsrMatrix, CsrMatrixExt, Matrix, Vector},
};
use std::{cmp::Ordering, rc::Rc};

pub const METHOD: &str = "krylovschur";

const GOLDEN: f64 = 0.618_033_988_749_894_9;
const BREAKDOWN_TOL: f64 = 1e-12;

#[derive(Default)]
pub struct KrylovSchur {
  operators: Option<(Rc<CsrMatrix>, Rc<CsrMatrix>)>,
  converged: ConvergedPairs,
}

impl KrylovSchur {
  pub fn new() -> Self {
    Self::default()
  }
}

impl EigenEngine for KrylovSchur {
  fn method(&self) -> &str {
    METHOD
  }

  fn set_operators(&mut self, stiffness: Rc<CsrMatrix>, mass: Rc<CsrMatrix>) -> Result<()> {
    check_operators(&stiffness, &mass)?;
    self.operators = Some((stiffness, mass));
    self.converged = ConvergedPairs::default();
    Ok(())
  }

  fn solve(&mut self, config: &EngineConfig) -> Result<SolveReport> {
    if let Some(method) = config.method.as_deref() {
      if method != METHOD {
        return Err(EvpError::EngineFailure(format!(
          "method `{method}` is not available, only `{METHOD}`"
        )));
      }
    }
    for name in config.passthrough.keys() {
      tracing::warn!("option `{name}` is ignored by the {METHOD} engine");
    }

    let (stiffness, mass) = self
      .operators
      .clone()
      .ok_or_else(|| EvpError::EngineFailure(String::from("operators not set")))?;

    self.converged = ConvergedPairs::default();
    let (pairs, iterations, ncv) = krylov_schur(&stiffness, &mass, config)?;
    self.converged = pairs;

    Ok(SolveReport {
      method: METHOD.to_owned(),
      iterations: Some(iterations),
      nconv: self.converged.len(),
      nev: config.nev.min(stiffness.nrows()),
      ncv,
      tol: config.tol,
      max_it: config.max_it,
    })
  }

  fn nconv(&self) -> usize {
    self.converged.len()
  }

  fn eigenpair(&self, i: usize, real: &mut Vector, imag: &mut Vector) -> Result<Complex> {
    self.converged.copy_pair(i, real, imag)
  }
}

/// M-orthonormal basis together with the images of its vectors under M.
struct MBasis<'a> {
  mass: &'a CsrMatrix,
  vecs: Vec<Vector>,
  mvecs: Vec<Vector>,
}
impl<'a> MBasis<'a> {
  fn new(mass: &'a CsrMatrix, capacity: usize) -> Self {
    Self {
      mass,
      vecs: Vec::with_capacity(capacity),
      mvecs: Vec::with_capacity(capacity),
    }
  }

  fn len(&self) -> usize {
    self.vecs.len()
  }

  /// Orthogonalizes `w` against the basis with two passes of classical Gram-Schmidt.
  ///
  /// Returns the coefficients, the $M$ image of the remainder and its $M$ norm.
  fn orthogonalize(&self, w: &mut Vector) -> (Vec<f64>, Vector, f64) {
    let mut mw = self.mass * &*w;
    let mut coeffs = vec![0.0; self.len()];
    for _ in 0..2 {
      let pass: Vec<f64> = self.mvecs.iter().map(|mv| mv.dot(&*w)).collect();
      for (i, &c) in pass.iter().enumerate() {
        w.axpy(-c, &self.vecs[i], 1.0);
        mw.axpy(-c, &self.mvecs[i], 1.0);
        coeffs[i] += c;
      }
    }
    let norm = w.dot(&mw).max(0.0).sqrt();
    (coeffs, mw, norm)
  }

  fn push_normalized(&mut self, w: Vector, mw: Vector, norm: f64) {
    if norm > 0.0 {
      self.vecs.push(w / norm);
      self.mvecs.push(mw / norm);
    } else {
      self.vecs.push(w);
      self.mvecs.push(mw);
    }
  }

  /// Appends a new pseudo-random basis vector. Appends zero if the basis spans everything.
  fn push_fresh(&mut self, seed: usize) {
    let n = self.mass.nrows();
    let mut w = pseudo_random_vector(n, seed);
    let norm0 = quadratic_form_sparse(self.mass, &w).sqrt();
    let (_, mw, norm) = self.orthogonalize(&mut w);
    if norm > BREAKDOWN_TOL * norm0 {
      self.push_normalized(w, mw, norm);
    } else {
      self.push_normalized(Vector::zeros(n), Vector::zeros(n), 0.0);
    }
  }

  /// Replaces the basis by `keep` linear combinations of its first `m` vectors, followed by
  /// vector `m`.
  fn rotate(&mut self, coeffs: &[Vector], m: usize) {
    let n = self.mass.nrows();
    let combine = |vecs: &[Vector]| -> Vec<Vector> {
      coeffs
        .iter()
        .map(|y| {
          let mut x = Vector::zeros(n);
          for (v, &c) in vecs[..m].iter().zip(y.iter()) {
            x.axpy(c, v, 1.0);
          }
          x
        })
        .collect()
    };
    let mut vecs = combine(&self.vecs);
    let mut mvecs = combine(&self.mvecs);
    vecs.push(self.vecs.swap_remove(m));
    mvecs.push(self.mvecs.swap_remove(m));
    self.vecs = vecs;
    self.mvecs = mvecs;
  }
}

fn pseudo_random_vector(n: usize, seed: usize) -> Vector {
  Vector::from_fn(n, |i, _| {
    ((i as f64 + 1.0) * GOLDEN + (seed as f64) * GOLDEN.sqrt()).fract() - 0.5
  })
}

struct RitzPair {
  theta: f64,
  eigenval: f64,
  /// Column of the Ritz vector coefficients in the current basis.
  coeffs: Vector,
  residual: f64,
}

fn ritz_pairs(h: &Matrix, m: usize, sigma: f64) -> Vec<RitzPair> {
  let s = h.view((0, 0), (m, m));
  let s = (&s + s.transpose()) * 0.5;
  let beta = h[(m, m - 1)];

  let eigen = na::SymmetricEigen::new(s);
  let mut pairs: Vec<RitzPair> = eigen
    .eigenvalues
    .iter()
    .zip(eigen.eigenvectors.column_iter())
    .map(|(&theta, y)| RitzPair {
      theta,
      eigenval: sigma + theta.recip(),
      coeffs: y.into_owned(),
      residual: (beta * y[m - 1]).abs(),
    })
    .collect();

  pairs.sort_by(|a, b| {
    b.theta
      .abs()
      .partial_cmp(&a.theta.abs())
      .unwrap_or(Ordering::Equal)
      .then_with(|| a.eigenval.partial_cmp(&b.eigenval).unwrap_or(Ordering::Equal))
  });
  pairs
}

fn is_converged(pair: &RitzPair, tol: f64) -> bool {
  pair.theta != 0.0 && pair.residual <= tol * pair.theta.abs()
}

/// Returns the converged pairs, the number of restarts and the subspace dimension.
fn krylov_schur(
  stiffness: &CsrMatrix,
  mass: &CsrMatrix,
  config: &EngineConfig,
) -> Result<(ConvergedPairs, usize, usize)> {
  let n = stiffness.nrows();
  if n == 0 {
    return Err(EvpError::EngineFailure(String::from(
      "eigenproblem has no degrees of freedom",
    )));
  }
  if config.nev == 0 {
    return Err(EvpError::ConfigurationConflict(String::from(
      "at least one eigenpair must be requested",
    )));
  }
  let nev = if config.nev > n {
    tracing::warn!("requested {} eigenpairs of a problem of size {n}", config.nev);
    n
  } else {
    config.nev
  };
  let ncv = config
    .ncv
    .unwrap_or((2 * nev).max(nev + 15))
    .max(nev + 1)
    .min(n);
  let sigma = config.target;

  let shifted = CsrMatrix::lin_comb(1.0, stiffness, -sigma, mass);
  let lu = FaerLu::new(shifted)?;
  let apply_op = |v: &Vector| -> Result<Vector> {
    let w = lu.solve(&(mass * v));
    if w.iter().all(|x| x.is_finite()) {
      Ok(w)
    } else {
      Err(EvpError::EngineFailure(format!(
        "shifted matrix (K - {sigma} M) is singular"
      )))
    }
  };

  let mut basis = MBasis::new(mass, ncv + 1);
  basis.push_fresh(0);
  let mut h = Matrix::zeros(ncv + 1, ncv);
  let mut nlocked = 0;
  let mut nfresh = 0;

  let mut iterations = 0;
  loop {
    iterations += 1;

    for j in nlocked..ncv {
      let mut w = apply_op(&basis.vecs[j])?;
      let norm0 = quadratic_form_sparse(mass, &w).max(0.0).sqrt();
      let (coeffs, mw, beta) = basis.orthogonalize(&mut w);
      for (i, c) in coeffs.into_iter().enumerate() {
        h[(i, j)] += c;
      }
      if beta > BREAKDOWN_TOL * norm0 {
        h[(j + 1, j)] = beta;
        basis.push_normalized(w, mw, beta);
      } else {
        // invariant subspace found, continue with an unrelated vector
        nfresh += 1;
        basis.push_fresh(nfresh);
      }
    }

    let pairs = ritz_pairs(&h, ncv, sigma);
    let nconv = pairs
      .iter()
      .take_while(|p| is_converged(p, config.tol))
      .count();
    tracing::debug!("krylov-schur restart {iterations}: {nconv}/{nev} converged");

    if nconv >= nev || iterations >= config.max_it {
      let eigenvecs = pairs[..nconv]
        .iter()
        .map(|p| {
          let mut x = Vector::zeros(n);
          for (v, &c) in basis.vecs[..ncv].iter().zip(p.coeffs.iter()) {
            x.axpy(c, v, 1.0);
          }
          x
        })
        .collect();
      let eigenvals = pairs[..nconv].iter().map(|p| p.eigenval).collect();
      return Ok((
        ConvergedPairs {
          eigenvals,
          eigenvecs,
        },
        iterations,
        ncv,
      ));
    }

    // thick restart keeping the best Ritz vectors
    let keep = ((ncv + nconv) / 2).max(nev).min(ncv - 1);
    let beta = h[(ncv, ncv - 1)];
    let coeffs: Vec<Vector> = pairs[..keep].iter().map(|p| p.coeffs.clone()).collect();
    basis.rotate(&coeffs, ncv);

    h.fill(0.0);
    for (t, p) in pairs[..keep].iter().enumerate() {
      h[(t, t)] = p.theta;
      h[(keep, t)] = beta * p.coeffs[ncv - 1];
    }
    nlocked = keep;
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::options::SolverOptions;
  use common::linalg::nalgebra::CooMatrix;

  /// 1D Dirichlet Laplacian with lumped mass, eigenvalues $4/h^2 sin^2(k pi h / 2)$.
  fn laplace_1d(n: usize) -> (CsrMatrix, CsrMatrix, f64) {
    let h = 1.0 / (n + 1) as f64;
    let mut k = CooMatrix::new(n, n);
    let mut m = CooMatrix::new(n, n);
    for i in 0..n {
      k.push(i, i, 2.0 / h);
      m.push(i, i, h);
      if i + 1 < n {
        k.push(i, i + 1, -1.0 / h);
        k.push(i + 1, i, -1.0 / h);
      }
    }
    (CsrMatrix::from(&k), CsrMatrix::from(&m), h)
  }

  fn solve(n: usize, options: SolverOptions, nev: usize) -> (KrylovSchur, SolveReport) {
    let (k, m, _) = laplace_1d(n);
    let mut engine = KrylovSchur::new();
    engine.set_operators(Rc::new(k), Rc::new(m)).unwrap();
    let config = SolverOptions::defaults()
      .merged(&options)
      .engine_config(nev)
      .unwrap();
    let report = engine.solve(&config).unwrap();
    (engine, report)
  }

  #[test]
  fn smallest_eigenvalues_of_1d_laplacian() {
    let n = 200;
    let (_, _, h) = laplace_1d(n);
    let (engine, report) = solve(n, SolverOptions::new(), 5);
    assert!(report.nconv >= 5, "{report}");

    let mut real = Vector::zeros(n);
    let mut imag = Vector::zeros(n);
    for i in 0..5 {
      let lambda = engine.eigenpair(i, &mut real, &mut imag).unwrap();
      let k = (i + 1) as f64;
      let exact = 4.0 / (h * h) * (k * std::f64::consts::PI * h / 2.0).sin().powi(2);
      approx::assert_relative_eq!(lambda.re, exact, max_relative = 1e-8);
      assert_eq!(lambda.im, 0.0);
      assert_eq!(imag.amax(), 0.0);
    }
  }

  #[test]
  fn target_selects_nearest() {
    let n = 100;
    let (_, _, h) = laplace_1d(n);
    let exact: Vec<f64> = (1..=n)
      .map(|k| 4.0 / (h * h) * (k as f64 * std::f64::consts::PI * h / 2.0).sin().powi(2))
      .collect();
    let target = exact[9] + 1.0;

    let (engine, report) = solve(n, SolverOptions::new().with("eps_target", target), 3);
    assert!(report.nconv >= 3);

    let mut by_distance = exact.clone();
    by_distance.sort_by(|a, b| (a - target).abs().partial_cmp(&(b - target).abs()).unwrap());

    let mut real = Vector::zeros(n);
    let mut imag = Vector::zeros(n);
    for (i, expected) in by_distance.iter().take(3).enumerate() {
      let lambda = engine.eigenpair(i, &mut real, &mut imag).unwrap();
      approx::assert_relative_eq!(lambda.re, *expected, max_relative = 1e-8);
    }
  }

  #[test]
  fn tiny_problem_converges_fully() {
    let (engine, report) = solve(4, SolverOptions::new(), 4);
    assert_eq!(report.nconv, 4);
    assert_eq!(report.ncv, 4);
    assert!(engine.converged.eigenvals.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn eigenpair_before_solve_is_out_of_range() {
    let engine = KrylovSchur::new();
    let mut v = Vector::zeros(1);
    let mut w = Vector::zeros(1);
    assert!(matches!(
      engine.eigenpair(0, &mut v, &mut w),
      Err(EvpError::OutOfRange { index: 0, bound: 0 })
    ));
  }

  #[test]
  fn unknown_method_fails() {
    let (k, m, _) = laplace_1d(3);
    let mut engine = KrylovSchur::new();
    engine.set_operators(Rc::new(k), Rc::new(m)).unwrap();
    let config = SolverOptions::new()
      .with("eps_type", "lobpcg")
      .engine_config(1)
      .unwrap();
    assert!(matches!(
      engine.solve(&config),
      Err(EvpError::EngineFailure(_))
    ));
  }
}
