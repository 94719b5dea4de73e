//! Export of eigenvalues and eigenmodes for visualization.

use crate::{
  error::{check_len, EvpError, Result},
  mesh::SimplicialMesh,
  session::EigenSolver,
};

use common::{linalg::nalgebra::Vector, util};
use std::{
  fs::{self, File},
  io::{BufWriter, Write},
  path::Path,
};
use vtkio::{
  model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, UnstructuredGridPiece, Version,
    VertexNumbers, Vtk,
  },
  IOBuffer,
};

/// Unstructured grid of the mesh with the given point data arrays.
///
/// Coordinates of meshes below dimension 3 are padded with zeros.
pub fn mesh_to_vtk(
  mesh: &SimplicialMesh,
  point_data: Vec<(String, Vector)>,
  title: impl Into<String>,
) -> Result<Vtk> {
  let cell_type = match mesh.dim() {
    1 => CellType::Line,
    2 => CellType::Triangle,
    3 => CellType::Tetra,
    dim => return Err(EvpError::Vtk(format!("cannot export mesh of dimension {dim}"))),
  };

  let coords = mesh.coords();
  let points: Vec<f64> = coords
    .column_iter()
    .flat_map(|c| (0..3).map(move |i| if i < c.len() { c[i] } else { 0.0 }))
    .collect();

  let vertices = mesh
    .cells()
    .iter()
    .flat_map(|cell| std::iter::once(cell.len()).chain(cell.iter().copied()))
    .map(|i| i as u32)
    .collect();
  let cells = Cells {
    cell_verts: VertexNumbers::Legacy {
      num_cells: mesh.ncells() as u32,
      vertices,
    },
    types: vec![cell_type; mesh.ncells()],
  };

  let mut data = Attributes::new();
  for (name, values) in point_data {
    check_len("vtk point data", mesh.nvertices(), values.len())?;
    data
      .point
      .push(Attribute::scalars(name, 1).with_data(values.iter().copied().collect::<Vec<_>>()));
  }

  let grid = UnstructuredGridPiece {
    points: IOBuffer::new(points),
    cells,
    data,
  };

  Ok(Vtk {
    version: Version::new((4, 2)),
    title: title.into(),
    byte_order: ByteOrder::BigEndian,
    data: grid.into(),
    file_path: None,
  })
}

/// Writes the first `n` eigenmodes as `mode-{i}.vtk` into `dir`, together with a
/// `modes.pvd` collection indexed by mode number.
pub fn save_eigenvectors(
  solver: &EigenSolver,
  mesh: &SimplicialMesh,
  n: usize,
  dir: impl AsRef<Path>,
  save_imaginary: bool,
) -> Result<()> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)?;

  let mut files = Vec::with_capacity(n);
  for i in 0..n {
    let pair = solver.eigenpair(i)?;
    let mut point_data = vec![(String::from("real"), pair.real.into_coeffs())];
    if save_imaginary {
      point_data.push((String::from("imag"), pair.imag.into_coeffs()));
    }
    let title = format!("eigenmode {i} lambda={}", pair.eigenvalue.re);
    let vtk = mesh_to_vtk(mesh, point_data, title)?;

    let file = format!("mode-{i}.vtk");
    vtk
      .export(dir.join(&file))
      .map_err(|e| EvpError::Vtk(e.to_string()))?;
    files.push(file);
  }

  let mut pvd = BufWriter::new(File::create(dir.join("modes.pvd"))?);
  write_collection(&mut pvd, &files)?;
  tracing::info!("wrote {n} eigenmodes to {}", dir.display());
  Ok(())
}

fn write_collection<W: Write>(mut writer: W, files: &[String]) -> std::io::Result<()> {
  writeln!(writer, r#"<?xml version="1.0"?>"#)?;
  writeln!(writer, r#"<VTKFile type="Collection" version="0.1">"#)?;
  writeln!(writer, "  <Collection>")?;
  for (i, file) in files.iter().enumerate() {
    writeln!(writer, r#"    <DataSet timestep="{i}" file="{file}"/>"#)?;
  }
  writeln!(writer, "  </Collection>")?;
  writeln!(writer, "</VTKFile>")?;
  writer.flush()
}

/// One eigenvalue per line.
pub fn save_eigenvalues(eigenvals: &Vector, path: impl AsRef<Path>) -> Result<()> {
  util::save_vector(eigenvals, path)?;
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::mesh::CartesianMeshInfo;

  #[test]
  fn vtk_grid_of_square() {
    let mesh = CartesianMeshInfo::new_unit(2, 2).to_mesh();
    let values = Vector::from_fn(mesh.nvertices(), |i, _| i as f64);
    let vtk = mesh_to_vtk(&mesh, vec![("u".into(), values)], "square").unwrap();

    let vtkio::model::DataSet::UnstructuredGrid { pieces, .. } = vtk.data else {
      panic!("expected unstructured grid");
    };
    let vtkio::model::Piece::Inline(grid) = &pieces[0] else {
      panic!("expected inline piece");
    };
    assert_eq!(grid.points.len(), 3 * 9);
    assert_eq!(grid.cells.types.len(), 8);
    assert_eq!(grid.data.point.len(), 1);
  }

  #[test]
  fn point_data_length_checked() {
    let mesh = CartesianMeshInfo::new_unit(2, 2).to_mesh();
    let result = mesh_to_vtk(&mesh, vec![("u".into(), Vector::zeros(3))], "bad");
    assert!(matches!(result, Err(EvpError::ShapeMismatch { .. })));
  }

  #[test]
  fn collection_lists_modes_in_order() {
    let mut buf = Vec::new();
    write_collection(&mut buf, &["mode-0.vtk".into(), "mode-1.vtk".into()]).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let first = text.find(r#"timestep="0" file="mode-0.vtk""#).unwrap();
    let second = text.find(r#"timestep="1" file="mode-1.vtk""#).unwrap();
    assert!(first < second);
  }
}
