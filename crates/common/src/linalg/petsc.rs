//! Reading and writing the PETSc binary format.
//!
//! All integers are big-endian `i32`, all scalars big-endian `f64`.

use std::{
  fs::File,
  io::{self, BufReader, BufWriter, Read, Write},
  path::Path,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::nalgebra::{CsrMatrix, Matrix, Vector};

pub const PETSC_MAT_FILE_CLASSID: i32 = 1211216;
pub const PETSC_VEC_FILE_CLASSID: i32 = 1211214;

fn invalid_data(msg: String) -> io::Error {
  io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn to_i32(n: usize) -> io::Result<i32> {
  i32::try_from(n).map_err(|_| invalid_data(format!("{n} does not fit into a PETSc int")))
}

fn read_len<R: Read>(reader: &mut R) -> io::Result<usize> {
  let n = reader.read_i32::<BigEndian>()?;
  usize::try_from(n).map_err(|_| invalid_data(format!("negative length {n}")))
}

fn expect_classid<R: Read>(reader: &mut R, classid: i32) -> io::Result<()> {
  let magic = reader.read_i32::<BigEndian>()?;
  if magic != classid {
    return Err(invalid_data(format!(
      "expected PETSc class id {classid}, found {magic}"
    )));
  }
  Ok(())
}

pub fn write_matrix<W: Write>(mut writer: W, matrix: &CsrMatrix) -> io::Result<()> {
  writer.write_i32::<BigEndian>(PETSC_MAT_FILE_CLASSID)?;

  writer.write_i32::<BigEndian>(to_i32(matrix.nrows())?)?;
  writer.write_i32::<BigEndian>(to_i32(matrix.ncols())?)?;
  writer.write_i32::<BigEndian>(to_i32(matrix.nnz())?)?;

  let row_offsets = matrix.row_offsets();
  for w in row_offsets.windows(2) {
    writer.write_i32::<BigEndian>(to_i32(w[1] - w[0])?)?;
  }
  for &col in matrix.col_indices() {
    writer.write_i32::<BigEndian>(to_i32(col)?)?;
  }
  for &value in matrix.values() {
    writer.write_f64::<BigEndian>(value)?;
  }

  writer.flush()
}

pub fn write_vector<W: Write>(mut writer: W, vector: &Vector) -> io::Result<()> {
  writer.write_i32::<BigEndian>(PETSC_VEC_FILE_CLASSID)?;
  writer.write_i32::<BigEndian>(to_i32(vector.nrows())?)?;
  for &value in vector {
    writer.write_f64::<BigEndian>(value)?;
  }
  writer.flush()
}

pub fn read_vector<R: Read>(mut reader: R) -> io::Result<Vector> {
  expect_classid(&mut reader, PETSC_VEC_FILE_CLASSID)?;
  let nrows = read_len(&mut reader)?;

  let mut vector = Vector::zeros(nrows);
  for v in vector.iter_mut() {
    *v = reader.read_f64::<BigEndian>()?;
  }
  Ok(vector)
}

/// Eigenvalue file: length followed by raw scalars, without class id.
pub fn read_eigenvals<R: Read>(mut reader: R) -> io::Result<Vector> {
  let neigenvals = read_len(&mut reader)?;
  let mut eigenvals = Vector::zeros(neigenvals);
  for v in eigenvals.iter_mut() {
    *v = reader.read_f64::<BigEndian>()?;
  }
  Ok(eigenvals)
}

/// Eigenvector file: `nrows ncols` followed by `ncols` PETSc vectors.
pub fn read_eigenvecs<R: Read>(mut reader: R) -> io::Result<Matrix> {
  let nrows = read_len(&mut reader)?;
  let ncols = read_len(&mut reader)?;

  let mut eigenvecs = Matrix::zeros(nrows, ncols);
  for (icol, mut col) in eigenvecs.column_iter_mut().enumerate() {
    let eigenvec = read_vector(&mut reader)?;
    if eigenvec.len() != nrows {
      return Err(invalid_data(format!(
        "eigenvector {icol} has {} rows, expected {nrows}",
        eigenvec.len()
      )));
    }
    col.copy_from(&eigenvec);
  }
  Ok(eigenvecs)
}

pub fn petsc_write_matrix(matrix: &CsrMatrix, path: impl AsRef<Path>) -> io::Result<()> {
  write_matrix(BufWriter::new(File::create(path)?), matrix)
}
pub fn petsc_read_eigenvals(path: impl AsRef<Path>) -> io::Result<Vector> {
  read_eigenvals(BufReader::new(File::open(path)?))
}
pub fn petsc_read_eigenvecs(path: impl AsRef<Path>) -> io::Result<Matrix> {
  read_eigenvecs(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::linalg::nalgebra::CooMatrix;

  #[test]
  fn vector_round_trip() {
    let v = Vector::from_vec(vec![1.5, -2.0, 0.0, 1e-300]);
    let mut buf = Vec::new();
    write_vector(&mut buf, &v).unwrap();
    assert_eq!(buf.len(), 8 + 8 * v.len());
    assert_eq!(read_vector(buf.as_slice()).unwrap(), v);
  }

  #[test]
  fn matrix_header_and_row_lengths() {
    let mut coo = CooMatrix::new(2, 3);
    coo.push(0, 0, 1.0);
    coo.push(0, 2, 2.0);
    coo.push(1, 1, 3.0);
    let csr = CsrMatrix::from(&coo);

    let mut buf = Vec::new();
    write_matrix(&mut buf, &csr).unwrap();

    let mut reader = buf.as_slice();
    let ints: Vec<i32> = (0..6)
      .map(|_| reader.read_i32::<BigEndian>().unwrap())
      .collect();
    assert_eq!(ints, vec![PETSC_MAT_FILE_CLASSID, 2, 3, 3, 2, 1]);
  }

  #[test]
  fn eigenvecs_reject_bad_classid() {
    let mut buf = Vec::new();
    buf.write_i32::<BigEndian>(1).unwrap();
    buf.write_i32::<BigEndian>(1).unwrap();
    buf.write_i32::<BigEndian>(PETSC_MAT_FILE_CLASSID).unwrap();
    let err = read_eigenvecs(buf.as_slice()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
  }

  #[test]
  fn eigenvecs_are_columns() {
    let mut buf = Vec::new();
    buf.write_i32::<BigEndian>(2).unwrap();
    buf.write_i32::<BigEndian>(2).unwrap();
    for col in [[1.0, 2.0], [3.0, 4.0]] {
      write_vector(&mut buf, &Vector::from_row_slice(&col)).unwrap();
    }
    let m = read_eigenvecs(buf.as_slice()).unwrap();
    assert_eq!(m, Matrix::from_row_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]));
  }
}
