use crate::{mesh::SimplicialMesh, operators::ElMatProvider};

use common::linalg::nalgebra::CooMatrix;
use itertools::Itertools;
use rayon::prelude::*;

pub type GalMat = CooMatrix;

/// Assembly algorithm for the Galerkin Matrix of the first order Lagrangian space.
///
/// Duplicate triplets are kept and summed on conversion to a compressed format.
pub fn assemble_galmat(mesh: &SimplicialMesh, elmat: impl ElMatProvider) -> GalMat {
  let ndofs = mesh.nvertices();

  let triplets: Vec<(usize, usize, f64)> = (0..mesh.ncells())
    .into_par_iter()
    .flat_map_iter(|icell| {
      let cell = &mesh.cells()[icell];
      let elmat = elmat.eval(&mesh.cell_coords(icell));

      let mut local_triplets = Vec::with_capacity(cell.len() * cell.len());
      for (ilocal, &iglobal) in cell.iter().enumerate() {
        for (jlocal, &jglobal) in cell.iter().enumerate() {
          let val = elmat[(ilocal, jlocal)];
          if val != 0.0 {
            local_triplets.push((iglobal, jglobal, val));
          }
        }
      }
      local_triplets
    })
    .collect();

  let (rows, cols, values) = triplets.into_iter().multiunzip();
  GalMat::try_from_triplets(ndofs, ndofs, rows, cols, values)
    .expect("assembled indices are mesh vertices")
}
