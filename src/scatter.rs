//! Transfer of coefficients between the reduced space and the full space.

use crate::{
  dof::{DofIdx, InteriorDofs},
  error::{check_len, Result},
};

use common::linalg::nalgebra::Vector;

/// Index map from reduced positions `0..n` to the local positions of the interior DOFs.
///
/// Built once per session and reused for every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scatter {
  full_len: usize,
  targets: Vec<usize>,
  identity: bool,
}
impl Scatter {
  pub fn new(reduced_len: usize, interior: &InteriorDofs, full_len: usize) -> Result<Self> {
    let range = interior.range();
    check_len("scatter reduced length", interior.len(), reduced_len)?;
    check_len("scatter full length", range.len(), full_len)?;

    let targets: Vec<DofIdx> = interior
      .indices()
      .iter()
      .map(|&idof| range.local(idof))
      .collect();
    let identity = reduced_len == full_len;
    Ok(Self {
      full_len,
      targets,
      identity,
    })
  }

  pub fn reduced_len(&self) -> usize {
    self.targets.len()
  }
  pub fn full_len(&self) -> usize {
    self.full_len
  }
  pub fn is_identity(&self) -> bool {
    self.identity
  }

  /// Copies `src[i]` into `dst[targets[i]]`. All other entries of `dst` are left untouched.
  pub fn scatter(&self, src: &Vector, dst: &mut Vector) -> Result<()> {
    check_len("scatter source", self.reduced_len(), src.len())?;
    check_len("scatter destination", self.full_len, dst.len())?;

    if self.identity {
      dst.copy_from(src);
      return Ok(());
    }
    for (&value, &target) in src.iter().zip(&self.targets) {
      dst[target] = value;
    }
    Ok(())
  }

  /// Extracts the interior entries of a full-space vector.
  pub fn gather(&self, src: &Vector) -> Result<Vector> {
    check_len("gather source", self.full_len, src.len())?;
    Ok(Vector::from_iterator(
      self.reduced_len(),
      self.targets.iter().map(|&t| src[t]),
    ))
  }
}
