//! Eigensolver session for $K x = lambda M x$ on the DOFs not fixed by boundary conditions.

use crate::{
  assemble::{self, GalMat},
  dof::{interior_dofs, DirichletBc, DofCoeff, DofIdx, FeFunction, FeSpace, InteriorDofs},
  engine::{Complex, EigenEngine, KrylovSchur, SolveReport},
  error::{EvpError, Result},
  mesh::SimplicialMesh,
  operators::ElMatProvider,
  options::SolverOptions,
  reduce::restrict_galmat,
  scatter::Scatter,
};

use common::linalg::nalgebra::{CsrMatrix, Vector};
use std::rc::Rc;

/// Eigenvalue with the real and imaginary parts of its eigenvector as full-space functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenpair {
  pub eigenvalue: Complex,
  pub real: FeFunction,
  pub imag: FeFunction,
}

pub struct EigenSolver {
  space: FeSpace,
  options: SolverOptions,
  interior: InteriorDofs,
  fixed: Vec<(DofIdx, DofCoeff)>,
  scatter: Scatter,
  stiffness: Rc<CsrMatrix>,
  mass: Rc<CsrMatrix>,
  engine: Box<dyn EigenEngine>,
  report: Option<SolveReport>,
}

impl EigenSolver {
  /// Session with the default Krylov-Schur engine.
  pub fn new(
    stiffness: &GalMat,
    mass: &GalMat,
    space: FeSpace,
    bcs: &[DirichletBc],
    options: SolverOptions,
  ) -> Result<Self> {
    Self::with_engine(
      stiffness,
      mass,
      space,
      bcs,
      options,
      Box::new(KrylovSchur::default()),
    )
  }

  pub fn with_engine(
    stiffness: &GalMat,
    mass: &GalMat,
    space: FeSpace,
    bcs: &[DirichletBc],
    options: SolverOptions,
    mut engine: Box<dyn EigenEngine>,
  ) -> Result<Self> {
    let options = SolverOptions::defaults().merged(&options);
    options.check_reserved()?;

    let interior = interior_dofs(bcs, space.ownership())?;
    let fixed = interior.fixed_values(bcs);

    let stiffness = Rc::new(restrict_galmat(stiffness, &interior)?);
    let mass = Rc::new(restrict_galmat(mass, &interior)?);
    tracing::info!(
      "reduced {} DOFs to {} interior DOFs ({} constrained)",
      interior.range().len(),
      interior.len(),
      interior.constrained().len()
    );

    let scatter = Scatter::new(interior.len(), &interior, space.ownership().len())?;
    engine.set_operators(Rc::clone(&stiffness), Rc::clone(&mass))?;

    Ok(Self {
      space,
      options,
      interior,
      fixed,
      scatter,
      stiffness,
      mass,
      engine,
      report: None,
    })
  }

  /// Assembles the Galerkin matrices of the bilinear forms on the first order Lagrangian space.
  pub fn from_forms(
    mesh: &SimplicialMesh,
    stiffness_form: impl ElMatProvider,
    mass_form: impl ElMatProvider,
    bcs: &[DirichletBc],
    options: SolverOptions,
  ) -> Result<Self> {
    let stiffness = assemble::assemble_galmat(mesh, stiffness_form);
    let mass = assemble::assemble_galmat(mesh, mass_form);
    Self::new(&stiffness, &mass, FeSpace::lagrange1(mesh), bcs, options)
  }

  /// Solves for the `n_eig` eigenpairs closest to the target.
  pub fn solve(&mut self, n_eig: usize) -> Result<SolveReport> {
    let config = self.options.engine_config(n_eig)?;
    for (name, value) in self.options.iter() {
      tracing::debug!("option -{name} {value}");
    }

    self.report = None;
    let report = self.engine.solve(&config)?;
    tracing::info!("{report}");
    self.report = Some(report.clone());
    Ok(report)
  }

  /// Number of converged eigenpairs, zero before the first solve.
  pub fn nconv(&self) -> usize {
    self.engine.nconv()
  }
  pub fn report(&self) -> Option<&SolveReport> {
    self.report.as_ref()
  }
  pub fn options(&self) -> &SolverOptions {
    &self.options
  }
  pub fn space(&self) -> &FeSpace {
    &self.space
  }
  pub fn interior(&self) -> &InteriorDofs {
    &self.interior
  }
  pub fn scatter(&self) -> &Scatter {
    &self.scatter
  }
  pub fn reduced_operators(&self) -> (&CsrMatrix, &CsrMatrix) {
    (&self.stiffness, &self.mass)
  }

  /// The `i`-th converged eigenpair as full-space functions.
  ///
  /// Constrained DOFs of the real part carry their boundary values, those of the imaginary
  /// part are zero.
  pub fn eigenpair(&self, i: usize) -> Result<Eigenpair> {
    let nconv = self.nconv();
    if i >= nconv {
      return Err(EvpError::OutOfRange {
        index: i,
        bound: nconv,
      });
    }

    let nreduced = self.scatter.reduced_len();
    let mut real_reduced = Vector::zeros(nreduced);
    let mut imag_reduced = Vector::zeros(nreduced);
    let eigenvalue = self
      .engine
      .eigenpair(i, &mut real_reduced, &mut imag_reduced)?;

    let mut real = FeFunction::zeros(self.space);
    let mut imag = FeFunction::zeros(self.space);
    self.scatter.scatter(&real_reduced, real.coeffs_mut())?;
    self.scatter.scatter(&imag_reduced, imag.coeffs_mut())?;

    let range = self.interior.range();
    for &(idof, value) in &self.fixed {
      real.coeffs_mut()[range.local(idof)] = value;
    }

    Ok(Eigenpair {
      eigenvalue,
      real,
      imag,
    })
  }

  /// Real parts of the first `n` eigenvalues.
  pub fn eigenvalues(&self, n: usize) -> Result<Vector> {
    let eigenvals = (0..n)
      .map(|i| self.eigenpair(i).map(|pair| pair.eigenvalue.re))
      .collect::<Result<Vec<_>>>()?;
    Ok(Vector::from_vec(eigenvals))
  }

  pub fn eigenpairs(&self, n: usize) -> Result<Vec<Eigenpair>> {
    (0..n).map(|i| self.eigenpair(i)).collect()
  }
}
