//! Degrees of freedom, their ownership and the boundary conditions fixing them.

use crate::{
  error::{check_len, EvpError, Result},
  mesh::SimplicialMesh,
};

use common::{linalg::nalgebra::Vector, util};
use indexmap::IndexMap;

pub type DofIdx = usize;
pub type DofCoeff = f64;

/// Contiguous range $[lo, hi)$ of global DOFs owned by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofRange {
  lo: DofIdx,
  hi: DofIdx,
}
impl DofRange {
  pub fn new(lo: DofIdx, hi: DofIdx) -> Result<Self> {
    if lo > hi {
      return Err(EvpError::ConfigurationConflict(format!(
        "invalid DOF range [{lo}, {hi})"
      )));
    }
    Ok(Self { lo, hi })
  }
  pub fn full(ndofs: usize) -> Self {
    Self { lo: 0, hi: ndofs }
  }
  pub fn lo(&self) -> DofIdx {
    self.lo
  }
  pub fn hi(&self) -> DofIdx {
    self.hi
  }
  pub fn len(&self) -> usize {
    self.hi - self.lo
  }
  pub fn is_empty(&self) -> bool {
    self.lo == self.hi
  }
  pub fn contains(&self, idof: DofIdx) -> bool {
    (self.lo..self.hi).contains(&idof)
  }
  pub fn iter(&self) -> std::ops::Range<DofIdx> {
    self.lo..self.hi
  }
  /// Position of a global DOF inside the local range.
  pub fn local(&self, idof: DofIdx) -> usize {
    debug_assert!(self.contains(idof));
    idof - self.lo
  }
}

/// Finite element space, as far as the layout of its coefficients is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeSpace {
  ndofs: usize,
  ownership: DofRange,
}
impl FeSpace {
  /// Fails if the owned range reaches past the last DOF.
  pub fn new(ndofs: usize, ownership: DofRange) -> Result<Self> {
    if ownership.hi() > ndofs {
      return Err(EvpError::ConfigurationConflict(format!(
        "owned DOFs [{}, {}) exceed the {ndofs} DOFs of the space",
        ownership.lo(),
        ownership.hi()
      )));
    }
    Ok(Self { ndofs, ownership })
  }
  /// Serial space owning all DOFs.
  pub fn serial(ndofs: usize) -> Self {
    Self {
      ndofs,
      ownership: DofRange::full(ndofs),
    }
  }
  /// First order Lagrangian space, one DOF per mesh vertex.
  pub fn lagrange1(mesh: &SimplicialMesh) -> Self {
    Self::serial(mesh.nvertices())
  }
  pub fn ndofs(&self) -> usize {
    self.ndofs
  }
  pub fn ownership(&self) -> DofRange {
    self.ownership
  }
}

/// Locally owned coefficients of a finite element function.
#[derive(Debug, Clone, PartialEq)]
pub struct FeFunction {
  space: FeSpace,
  coeffs: Vector,
}
impl FeFunction {
  pub fn new(space: FeSpace, coeffs: Vector) -> Result<Self> {
    check_len("fe function coefficients", space.ownership().len(), coeffs.len())?;
    Ok(Self { space, coeffs })
  }
  pub fn zeros(space: FeSpace) -> Self {
    let coeffs = Vector::zeros(space.ownership().len());
    Self { space, coeffs }
  }
  pub fn space(&self) -> &FeSpace {
    &self.space
  }
  pub fn coeffs(&self) -> &Vector {
    &self.coeffs
  }
  pub fn coeffs_mut(&mut self) -> &mut Vector {
    &mut self.coeffs
  }
  pub fn into_coeffs(self) -> Vector {
    self.coeffs
  }
  /// Coefficient of a global DOF.
  pub fn get(&self, idof: DofIdx) -> Option<DofCoeff> {
    let range = self.space.ownership();
    range.contains(idof).then(|| self.coeffs[range.local(idof)])
  }
}

/// Essential boundary condition, fixing DOFs to prescribed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirichletBc {
  values: IndexMap<DofIdx, DofCoeff>,
}
impl DirichletBc {
  pub fn new(values: IndexMap<DofIdx, DofCoeff>) -> Self {
    Self { values }
  }
  pub fn homogeneous(dofs: impl IntoIterator<Item = DofIdx>) -> Self {
    Self::from_fn(dofs, |_| 0.0)
  }
  pub fn from_fn<F>(dofs: impl IntoIterator<Item = DofIdx>, f: F) -> Self
  where
    F: Fn(DofIdx) -> DofCoeff,
  {
    let values = dofs.into_iter().map(|idof| (idof, f(idof))).collect();
    Self { values }
  }
  /// Homogeneous condition on the whole mesh boundary.
  pub fn on_boundary(mesh: &SimplicialMesh) -> Self {
    Self::homogeneous(mesh.boundary_vertices().iter().copied())
  }

  pub fn boundary_values(&self) -> &IndexMap<DofIdx, DofCoeff> {
    &self.values
  }
  pub fn dofs(&self) -> impl Iterator<Item = DofIdx> + '_ {
    self.values.keys().copied()
  }
  pub fn len(&self) -> usize {
    self.values.len()
  }
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// Ascending DOFs of the owned range that are not fixed by any boundary condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteriorDofs {
  range: DofRange,
  interior: Vec<DofIdx>,
  constrained: Vec<DofIdx>,
}
impl InteriorDofs {
  pub fn range(&self) -> DofRange {
    self.range
  }
  pub fn indices(&self) -> &[DofIdx] {
    &self.interior
  }
  pub fn constrained(&self) -> &[DofIdx] {
    &self.constrained
  }
  pub fn len(&self) -> usize {
    self.interior.len()
  }
  pub fn is_empty(&self) -> bool {
    self.interior.is_empty()
  }
  /// No DOF of the range is constrained.
  pub fn is_full(&self) -> bool {
    self.constrained.is_empty()
  }

  /// Prescribed values on the constrained DOFs, later conditions overriding earlier ones.
  pub fn fixed_values(&self, bcs: &[DirichletBc]) -> Vec<(DofIdx, DofCoeff)> {
    let mut fixed: IndexMap<DofIdx, DofCoeff> = IndexMap::new();
    for bc in bcs {
      fixed.extend(bc.boundary_values().iter().map(|(&i, &v)| (i, v)));
    }
    fixed.sort_unstable_keys();
    fixed.into_iter().collect()
  }
}

/// Computes the DOFs of `range` that appear in none of the boundary conditions.
///
/// Fails with [`EvpError::ConfigurationConflict`] if a condition references a DOF
/// outside of `range`.
pub fn interior_dofs(bcs: &[DirichletBc], range: DofRange) -> Result<InteriorDofs> {
  let mut constrained_local = Vec::new();
  for bc in bcs {
    for idof in bc.dofs() {
      if !range.contains(idof) {
        return Err(EvpError::ConfigurationConflict(format!(
          "boundary condition DOF {idof} outside of owned range [{}, {})",
          range.lo(),
          range.hi()
        )));
      }
      constrained_local.push(range.local(idof));
    }
  }
  let flags = util::indicies_to_flags(&constrained_local, range.len());

  let (constrained, interior): (Vec<_>, Vec<_>) = range
    .iter()
    .zip(flags)
    .partition(|&(_, is_constrained)| is_constrained);

  let interior = interior.into_iter().map(|(idof, _)| idof).collect();
  let constrained = constrained.into_iter().map(|(idof, _)| idof).collect();

  Ok(InteriorDofs {
    range,
    interior,
    constrained,
  })
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn no_conditions_give_full_range() {
    let interior = interior_dofs(&[], DofRange::new(3, 8).unwrap()).unwrap();
    assert_eq!(interior.indices(), &[3, 4, 5, 6, 7]);
    assert!(interior.is_full());
  }

  #[test]
  fn inverted_range_and_oversized_ownership_are_rejected() {
    assert!(matches!(
      DofRange::new(5, 3),
      Err(EvpError::ConfigurationConflict(_))
    ));
    assert!(DofRange::new(3, 3).unwrap().is_empty());
    assert!(matches!(
      FeSpace::new(4, DofRange::full(5)),
      Err(EvpError::ConfigurationConflict(_))
    ));
    let space = FeSpace::new(10, DofRange::new(5, 10).unwrap()).unwrap();
    assert_eq!(space.ownership().len(), 5);
  }

  #[test]
  fn overlapping_conditions_count_once() {
    let bcs = [
      DirichletBc::homogeneous([0, 4, 2]),
      DirichletBc::homogeneous([4, 5]),
    ];
    let interior = interior_dofs(&bcs, DofRange::full(7)).unwrap();
    assert_eq!(interior.indices(), &[1, 3, 6]);
    assert_eq!(interior.constrained(), &[0, 2, 4, 5]);
  }

  #[test]
  fn foreign_dof_is_conflict() {
    let bcs = [DirichletBc::homogeneous([1, 9])];
    let err = interior_dofs(&bcs, DofRange::new(0, 5).unwrap()).unwrap_err();
    assert!(matches!(err, EvpError::ConfigurationConflict(_)));
  }

  #[test]
  fn later_condition_values_win() {
    let bcs = [
      DirichletBc::from_fn([2, 0], |i| i as f64),
      DirichletBc::from_fn([2], |_| -1.0),
    ];
    let interior = interior_dofs(&bcs, DofRange::full(3)).unwrap();
    assert_eq!(interior.fixed_values(&bcs), vec![(0, 0.0), (2, -1.0)]);
  }
}
