//! Restriction of Galerkin matrices to the interior DOFs.

use crate::{
  assemble::GalMat,
  dof::InteriorDofs,
  error::{check_len, Result},
};

use common::{
  linalg::nalgebra::{CooMatrix, CsrMatrix},
  util,
};

/// Principal submatrix on the rows and columns of the interior DOFs, in their order.
///
/// The rows and columns of `galmat` are the locally owned DOFs, i.e. row `r` belongs to
/// global DOF `lo + r`. Duplicate entries are summed.
pub fn restrict_galmat(galmat: &GalMat, interior: &InteriorDofs) -> Result<CsrMatrix> {
  let range = interior.range();
  check_len("galerkin matrix rows", range.len(), galmat.nrows())?;
  check_len("galerkin matrix columns", range.len(), galmat.ncols())?;

  if interior.is_full() {
    return Ok(CsrMatrix::from(galmat));
  }

  let reduced_positions = util::sparse_to_dense_data(
    interior
      .indices()
      .iter()
      .enumerate()
      .map(|(ireduced, &idof)| (range.local(idof), ireduced))
      .collect(),
    range.len(),
  );

  let nreduced = interior.len();
  let mut reduced = CooMatrix::new(nreduced, nreduced);
  for (r, c, &v) in galmat.triplet_iter() {
    if let (Some(r), Some(c)) = (reduced_positions[r], reduced_positions[c]) {
      reduced.push(r, c, v);
    }
  }
  Ok(CsrMatrix::from(&reduced))
}
