//! Engine delegating to an external SLEPc solver binary.
//!
//! The operators are exchanged through files in the PETSc binary format:
//! `in/A.bin` and `in/B.bin` are written into the solver directory, the binary is run
//! there and leaves `out/eigenvals.bin` and `out/eigenvecs.bin` behind.

use super::{check_operators, Complex, ConvergedPairs, EigenEngine, SolveReport};
use crate::{
  error::{EvpError, Result},
  options::EngineConfig,
};

use common::linalg::{
  nalgebra::{CsrMatrix, Vector},
  petsc::{petsc_read_eigenvals, petsc_read_eigenvecs, petsc_write_matrix},
};
use std::{
  fs, io,
  path::{Path, PathBuf},
  process::Command,
  rc::Rc,
};

pub const DEFAULT_METHOD: &str = "krylovschur";

#[derive(Debug, Clone)]
pub struct SlepcProcess {
  solver_dir: PathBuf,
  binary: PathBuf,
  options_prefix: Option<String>,
  operators: Option<(Rc<CsrMatrix>, Rc<CsrMatrix>)>,
  converged: ConvergedPairs,
}

impl SlepcProcess {
  /// `binary` is resolved relative to `solver_dir` if it is not absolute.
  pub fn new(solver_dir: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
    Self {
      solver_dir: solver_dir.into(),
      binary: binary.into(),
      options_prefix: None,
      operators: None,
      converged: ConvergedPairs::default(),
    }
  }

  /// Prefix prepended to every option name, e.g. `evp_` gives `-evp_eps_target`.
  pub fn with_options_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.options_prefix = Some(prefix.into());
    self
  }

  pub fn solver_dir(&self) -> &Path {
    &self.solver_dir
  }

  /// Command line arguments of the solver binary.
  pub fn arguments(&self, config: &EngineConfig) -> Vec<String> {
    let prefix = self.options_prefix.as_deref().unwrap_or("");
    let mut args = Vec::new();
    let mut push = |name: &str, value: &str| {
      args.push(format!("-{prefix}{name}"));
      if !value.is_empty() {
        args.push(value.to_owned());
      }
    };

    push("eps_gen_hermitian", "");
    push("st_type", &config.transform.to_string());
    push("eps_target", &config.target.to_string());
    push("eps_target_magnitude", "");
    push("eps_nev", &config.nev.to_string());
    push("eps_tol", &config.tol.to_string());
    push("eps_max_it", &config.max_it.to_string());
    if let Some(ncv) = config.ncv {
      push("eps_ncv", &ncv.to_string());
    }
    if let Some(method) = &config.method {
      push("eps_type", method);
    }
    for (name, value) in &config.passthrough {
      push(name, value);
    }
    args
  }
}

impl EigenEngine for SlepcProcess {
  fn method(&self) -> &str {
    DEFAULT_METHOD
  }

  fn set_operators(&mut self, stiffness: Rc<CsrMatrix>, mass: Rc<CsrMatrix>) -> Result<()> {
    check_operators(&stiffness, &mass)?;
    self.operators = Some((stiffness, mass));
    self.converged = ConvergedPairs::default();
    Ok(())
  }

  fn solve(&mut self, config: &EngineConfig) -> Result<SolveReport> {
    let (stiffness, mass) = self
      .operators
      .clone()
      .ok_or_else(|| EvpError::EngineFailure(String::from("operators not set")))?;
    let n = stiffness.nrows();
    self.converged = ConvergedPairs::default();

    let in_dir = self.solver_dir.join("in");
    let out_dir = self.solver_dir.join("out");
    fs::create_dir_all(&in_dir)?;
    fs::create_dir_all(&out_dir)?;
    petsc_write_matrix(&stiffness, in_dir.join("A.bin"))?;
    petsc_write_matrix(&mass, in_dir.join("B.bin"))?;

    let eigenvals_path = out_dir.join("eigenvals.bin");
    let eigenvecs_path = out_dir.join("eigenvecs.bin");
    for path in [&eigenvals_path, &eigenvecs_path] {
      remove_if_exists(path)?;
    }

    let args = self.arguments(config);
    tracing::debug!("running {} {}", self.binary.display(), args.join(" "));
    let status = Command::new(&self.binary)
      .current_dir(&self.solver_dir)
      .args(&args)
      .status()?;
    if !status.success() {
      return Err(EvpError::EngineFailure(format!(
        "{} exited with {status}",
        self.binary.display()
      )));
    }

    for path in [&eigenvals_path, &eigenvecs_path] {
      if !path.exists() {
        return Err(EvpError::EngineFailure(format!(
          "{} exited without writing {}",
          self.binary.display(),
          path.display()
        )));
      }
    }
    let eigenvals = petsc_read_eigenvals(&eigenvals_path)?;
    let eigenvecs = petsc_read_eigenvecs(&eigenvecs_path)?;
    if eigenvecs.ncols() != eigenvals.len() || (eigenvecs.ncols() > 0 && eigenvecs.nrows() != n) {
      return Err(EvpError::EngineFailure(format!(
        "solver returned {} eigenvalues and {}x{} eigenvectors for a problem of size {n}",
        eigenvals.len(),
        eigenvecs.nrows(),
        eigenvecs.ncols()
      )));
    }

    self.converged = ConvergedPairs {
      eigenvals: eigenvals.iter().copied().collect(),
      eigenvecs: eigenvecs.column_iter().map(|c| c.into_owned()).collect(),
    };

    Ok(SolveReport {
      method: config
        .method
        .clone()
        .unwrap_or_else(|| DEFAULT_METHOD.to_owned()),
      iterations: None,
      nconv: self.converged.len(),
      nev: config.nev,
      ncv: config.ncv.unwrap_or(0),
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

fn remove_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_file(path) {
    Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
    _ => Ok(()),
  }
}
