//! Eigen solver options.
//!
//! Options are SLEPc style `name -> value` pairs, collected in an explicit value that is merged
//! immutably with the defaults when a session is created. There is no process wide registry.

use crate::error::{EvpError, Result};

use indexmap::IndexMap;
use std::{fmt, str::FromStr};

pub const DEFAULT_MAX_IT: usize = 100;
pub const DEFAULT_TOL: f64 = 1e-8;

/// Problem type flags of which only the generalized Hermitian one is compatible.
const PROBLEM_TYPE_FLAGS: &[&str] = &[
  "eps_hermitian",
  "eps_non_hermitian",
  "eps_gen_non_hermitian",
  "eps_pos_gen_non_hermitian",
  "eps_gen_indefinite",
];
const WHICH_FLAGS: &[&str] = &[
  "eps_largest_magnitude",
  "eps_smallest_magnitude",
  "eps_largest_real",
  "eps_smallest_real",
  "eps_largest_imaginary",
  "eps_smallest_imaginary",
  "eps_target_real",
  "eps_target_imaginary",
  "eps_all",
];
const RECOGNIZED: &[&str] = &[
  "eps_max_it",
  "eps_tol",
  "eps_ncv",
  "eps_target",
  "eps_type",
  "eps_gen_hermitian",
  "eps_target_magnitude",
  "eps_which",
  "st_type",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverOptions {
  values: IndexMap<String, String>,
}

impl SolverOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn defaults() -> Self {
    Self::new().with("eps_max_it", DEFAULT_MAX_IT)
  }

  /// Sets an option, replacing an earlier value of the same name.
  pub fn with(mut self, name: &str, value: impl ToString) -> Self {
    self.values.insert(normalize(name), value.to_string());
    self
  }

  /// Sets a flag option without value.
  pub fn flag(self, name: &str) -> Self {
    self.with(name, "")
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(&normalize(name)).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// New option set where the values of `other` take precedence.
  pub fn merged(&self, other: &SolverOptions) -> Self {
    let mut values = self.values.clone();
    values.extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    Self { values }
  }

  fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
    self
      .get(name)
      .map(|value| {
        value.parse().map_err(|_| {
          EvpError::ConfigurationConflict(format!("invalid value `{value}` for option `{name}`"))
        })
      })
      .transpose()
  }

  /// Rejects options that contradict the problem type, spectral transformation or
  /// eigenpair selection of the session.
  pub fn check_reserved(&self) -> Result<()> {
    let conflict = |msg: String| Err(EvpError::ConfigurationConflict(msg));

    for (name, value) in self.iter() {
      if PROBLEM_TYPE_FLAGS.contains(&name) {
        return conflict(format!(
          "`{name}` contradicts the generalized Hermitian problem type"
        ));
      }
      if WHICH_FLAGS.contains(&name) {
        return conflict(format!(
          "`{name}` contradicts the selection of eigenvalues closest to the target"
        ));
      }
      match name {
        "st_type" if value != SpectralTransform::ShiftInvert.to_string() => {
          return conflict(format!("`st_type {value}` contradicts shift-and-invert"));
        }
        "eps_which" if value != "target_magnitude" => {
          return conflict(format!(
            "`eps_which {value}` contradicts the selection of eigenvalues closest to the target"
          ));
        }
        "eps_nev" => {
          return conflict(String::from(
            "`eps_nev` is given by the number of requested eigenpairs",
          ));
        }
        _ => {}
      }
    }
    Ok(())
  }

  /// Resolves the options into the configuration of a solve for `nev` eigenpairs.
  pub fn engine_config(&self, nev: usize) -> Result<EngineConfig> {
    self.check_reserved()?;

    let passthrough = self
      .iter()
      .filter(|(name, _)| !RECOGNIZED.contains(name))
      .map(|(k, v)| (k.to_owned(), v.to_owned()))
      .collect();

    Ok(EngineConfig {
      problem: ProblemType::GenHermitian,
      transform: SpectralTransform::ShiftInvert,
      method: self.get("eps_type").map(str::to_owned),
      target: self.parse("eps_target")?.unwrap_or(0.0),
      nev,
      ncv: self.parse("eps_ncv")?,
      tol: self.parse("eps_tol")?.unwrap_or(DEFAULT_TOL),
      max_it: self.parse("eps_max_it")?.unwrap_or(DEFAULT_MAX_IT),
      passthrough,
    })
  }
}

fn normalize(name: &str) -> String {
  name.trim_start_matches('-').to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
  /// $K x = lambda M x$ with $K$ symmetric and $M$ symmetric positive definite.
  GenHermitian,
}
impl fmt::Display for ProblemType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::GenHermitian => write!(f, "ghep"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralTransform {
  /// Solves for $(K - sigma M)^(-1) M$ with $sigma$ the target.
  ShiftInvert,
}
impl fmt::Display for SpectralTransform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ShiftInvert => write!(f, "sinvert"),
    }
  }
}

/// Everything an engine needs to know about a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  pub problem: ProblemType,
  pub transform: SpectralTransform,
  /// Requested method, engine default if `None`.
  pub method: Option<String>,
  pub target: f64,
  pub nev: usize,
  pub ncv: Option<usize>,
  pub tol: f64,
  pub max_it: usize,
  /// Options not interpreted by this crate, forwarded unchanged.
  pub passthrough: IndexMap<String, String>,
}
