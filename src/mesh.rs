//! Simplicial meshes of axis-aligned boxes.

use crate::Dim;

use common::linalg::nalgebra::{Matrix, Vector};
use itertools::Itertools;

pub type VertexIdx = usize;

/// Cells as sorted vertex lists, coordinates as columns.
#[derive(Debug, Clone)]
pub struct SimplicialMesh {
  coords: Matrix,
  cells: Vec<Vec<VertexIdx>>,
  boundary_vertices: Vec<VertexIdx>,
}
impl SimplicialMesh {
  pub fn new(coords: Matrix, cells: Vec<Vec<VertexIdx>>, boundary_vertices: Vec<VertexIdx>) -> Self {
    let dim = coords.nrows();
    assert!(cells.iter().all(|c| c.len() == dim + 1));
    assert!(cells.iter().flatten().all(|&v| v < coords.ncols()));
    Self {
      coords,
      cells,
      boundary_vertices,
    }
  }

  pub fn dim(&self) -> Dim {
    self.coords.nrows()
  }
  pub fn nvertices(&self) -> usize {
    self.coords.ncols()
  }
  pub fn ncells(&self) -> usize {
    self.cells.len()
  }
  pub fn coords(&self) -> &Matrix {
    &self.coords
  }
  pub fn cells(&self) -> &[Vec<VertexIdx>] {
    &self.cells
  }
  pub fn boundary_vertices(&self) -> &[VertexIdx] {
    &self.boundary_vertices
  }

  /// Vertex coordinates of a cell as columns.
  pub fn cell_coords(&self, icell: usize) -> Matrix {
    let cell = &self.cells[icell];
    Matrix::from_fn(self.dim(), cell.len(), |r, c| self.coords[(r, cell[c])])
  }
}

/// converts linear index in 0..dim_len^d to cartesian index in (0)^d..(dim_len)^d
pub fn linear_index2cartesian_index(mut lin_idx: usize, dim_len: usize, dim: Dim) -> Vector<usize> {
  let mut cart_idx = Vector::zeros(dim);
  for icomp in 0..dim {
    cart_idx[icomp] = lin_idx % dim_len;
    lin_idx /= dim_len;
  }
  cart_idx
}

/// converts cartesian index in (0)^d..(dim_len)^d to linear index in 0..dim_len^d
pub fn cartesian_index2linear_index(cart_idx: &Vector<usize>, dim_len: usize) -> usize {
  let mut lin_idx = 0;
  for icomp in (0..cart_idx.len()).rev() {
    lin_idx *= dim_len;
    lin_idx += cart_idx[icomp];
  }
  lin_idx
}

/// Uniform mesh of the box $[min, max]$ with `ncells_axis` boxes along each axis,
/// each box split into $d!$ simplicies (Kuhn triangulation).
pub struct CartesianMeshInfo {
  min: Vector,
  max: Vector,
  ncells_axis: usize,
}
impl CartesianMeshInfo {
  pub fn new_min_max(min: Vector, max: Vector, ncells_axis: usize) -> Self {
    assert!(min.len() == max.len());
    assert!(ncells_axis > 0);
    Self {
      min,
      max,
      ncells_axis,
    }
  }
  pub fn new_unit(dim: Dim, ncells_axis: usize) -> Self {
    Self::new_min_max(Vector::zeros(dim), Vector::from_element(dim, 1.0), ncells_axis)
  }

  pub fn dim(&self) -> Dim {
    self.min.len()
  }
  pub fn ncells_axis(&self) -> usize {
    self.ncells_axis
  }
  pub fn nvertices_axis(&self) -> usize {
    self.ncells_axis + 1
  }
  pub fn nboxes(&self) -> usize {
    self.ncells_axis.pow(self.dim() as u32)
  }
  pub fn nvertices(&self) -> usize {
    self.nvertices_axis().pow(self.dim() as u32)
  }
  pub fn side_lengths(&self) -> Vector {
    &self.max - &self.min
  }

  pub fn vertex_pos(&self, ivertex: VertexIdx) -> Vector {
    let cart_idx = linear_index2cartesian_index(ivertex, self.nvertices_axis(), self.dim());
    (cart_idx.cast::<f64>() / self.ncells_axis as f64).component_mul(&self.side_lengths())
      + &self.min
  }

  pub fn is_vertex_on_boundary(&self, ivertex: VertexIdx) -> bool {
    linear_index2cartesian_index(ivertex, self.nvertices_axis(), self.dim())
      .iter()
      .any(|&c| c == 0 || c == self.ncells_axis)
  }

  pub fn boundary_vertices(&self) -> Vec<VertexIdx> {
    (0..self.nvertices())
      .filter(|&v| self.is_vertex_on_boundary(v))
      .collect()
  }

  pub fn compute_cells(&self) -> Vec<Vec<VertexIdx>> {
    let dim = self.dim();
    let mut cells = Vec::new();

    for ibox in 0..self.nboxes() {
      let vertex_icart_origin = linear_index2cartesian_index(ibox, self.ncells_axis, dim);
      let ivertex_origin = cartesian_index2linear_index(&vertex_icart_origin, self.nvertices_axis());

      // Each permutation of the basis directions gives rise to one simplex.
      for basisdirs in (0..dim).permutations(dim) {
        let mut cell = vec![ivertex_origin];
        let mut vertex_icart = vertex_icart_origin.clone();
        for basisdir in basisdirs {
          vertex_icart[basisdir] += 1;
          cell.push(cartesian_index2linear_index(&vertex_icart, self.nvertices_axis()));
        }
        cells.push(cell);
      }
    }
    cells
  }

  pub fn compute_vertex_coords(&self) -> Matrix {
    let mut coords = Matrix::zeros(self.dim(), self.nvertices());
    for (ivertex, mut coord) in coords.column_iter_mut().enumerate() {
      coord.copy_from(&self.vertex_pos(ivertex));
    }
    coords
  }

  pub fn to_mesh(&self) -> SimplicialMesh {
    SimplicialMesh::new(
      self.compute_vertex_coords(),
      self.compute_cells(),
      self.boundary_vertices(),
    )
  }
}

#[cfg(test)]
mod test {
  use super::CartesianMeshInfo;
  use common::linalg::nalgebra::Matrix;

  #[test]
  fn unit_square_mesh() {
    let mesh = CartesianMeshInfo::new_unit(2, 2).to_mesh();

    #[rustfmt::skip]
    let expected_coords = Matrix::from_column_slice(2, 9, &[
      0.0, 0.0,
      0.5, 0.0,
      1.0, 0.0,
      0.0, 0.5,
      0.5, 0.5,
      1.0, 0.5,
      0.0, 1.0,
      0.5, 1.0,
      1.0, 1.0,
    ]);
    assert_eq!(*mesh.coords(), expected_coords);

    let expected_cells = vec![
      vec![0, 1, 4],
      vec![0, 3, 4],
      vec![1, 2, 5],
      vec![1, 4, 5],
      vec![3, 4, 7],
      vec![3, 6, 7],
      vec![4, 5, 8],
      vec![4, 7, 8],
    ];
    assert_eq!(mesh.cells(), expected_cells.as_slice());
    assert_eq!(mesh.boundary_vertices(), &[0, 1, 2, 3, 5, 6, 7, 8]);
  }

  #[test]
  fn unit_cube_mesh() {
    let info = CartesianMeshInfo::new_unit(3, 3);
    let mesh = info.to_mesh();
    assert_eq!(mesh.nvertices(), 64);
    assert_eq!(mesh.ncells(), 6 * 27);
    // only the 2x2x2 inner vertices are interior
    assert_eq!(mesh.boundary_vertices().len(), 64 - 8);
  }
}
