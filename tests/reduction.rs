//! Interior DOF selection, matrix restriction and scatter on assembled FE operators.

use common::linalg::nalgebra::{DMatrixExt, Matrix, Vector};
use ghep::{
  assemble::assemble_galmat,
  dof::{interior_dofs, DirichletBc, DofRange},
  mesh::CartesianMeshInfo,
  operators::{LaplaceElmat, MassElmat},
  reduce::restrict_galmat,
  scatter::Scatter,
  EvpError,
};

#[test]
fn interior_and_constrained_partition_range() {
  let range = DofRange::new(20, 60).unwrap();
  let bcs = [
    DirichletBc::homogeneous([21, 22, 59]),
    DirichletBc::homogeneous([22, 40]),
    DirichletBc::default(),
  ];
  let interior = interior_dofs(&bcs, range).unwrap();

  let mut all: Vec<_> = interior
    .indices()
    .iter()
    .chain(interior.constrained())
    .copied()
    .collect();
  all.sort_unstable();
  assert_eq!(all, range.iter().collect::<Vec<_>>());

  assert_eq!(interior.constrained(), &[21, 22, 40, 59]);
  assert!(interior.indices().windows(2).all(|w| w[0] < w[1]));
  assert_eq!(interior.len(), 36);
}

#[test]
fn bc_outside_range_conflicts() {
  let result = interior_dofs(&[DirichletBc::homogeneous([5])], DofRange::new(10, 20).unwrap());
  assert!(matches!(result, Err(EvpError::ConfigurationConflict(_))));
}

#[test]
fn restricted_operators_stay_spd() {
  let mesh = CartesianMeshInfo::new_unit(2, 4).to_mesh();
  let laplace = assemble_galmat(&mesh, LaplaceElmat);
  let mass = assemble_galmat(&mesh, MassElmat);

  let interior = interior_dofs(
    &[DirichletBc::on_boundary(&mesh)],
    DofRange::full(mesh.nvertices()),
  )
  .unwrap();
  assert_eq!(interior.len(), 9);

  let full = Matrix::from(&laplace);
  let reduced = Matrix::from(&restrict_galmat(&laplace, &interior).unwrap());
  for (r, &ir) in interior.indices().iter().enumerate() {
    for (c, &ic) in interior.indices().iter().enumerate() {
      approx::assert_relative_eq!(reduced[(r, c)], full[(ir, ic)], epsilon = 1e-12);
    }
  }
  assert!(reduced.is_symmetric(1e-12));
  assert!(reduced.is_spd());

  let reduced_mass = Matrix::from(&restrict_galmat(&mass, &interior).unwrap());
  assert!(reduced_mass.is_spd());
}

#[test]
fn gather_inverts_scatter() {
  let range = DofRange::new(100, 110).unwrap();
  let interior = interior_dofs(&[DirichletBc::homogeneous([100, 104, 109])], range).unwrap();
  let scatter = Scatter::new(interior.len(), &interior, range.len()).unwrap();
  assert!(!scatter.is_identity());

  let reduced = Vector::from_fn(interior.len(), |i, _| (i + 1) as f64);
  let mut full = Vector::zeros(range.len());
  scatter.scatter(&reduced, &mut full).unwrap();
  assert_eq!(scatter.gather(&full).unwrap(), reduced);
  assert_eq!(full[0], 0.0);
  assert_eq!(full[4], 0.0);
  assert_eq!(full[9], 0.0);
  assert_eq!(full[1], 1.0);
}

#[test]
fn no_conditions_give_identity_scatter() {
  let interior = interior_dofs(&[], DofRange::full(5)).unwrap();
  let scatter = Scatter::new(5, &interior, 5).unwrap();
  assert!(scatter.is_identity());

  let src = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
  let mut dst = Vector::zeros(5);
  scatter.scatter(&src, &mut dst).unwrap();
  assert_eq!(dst, src);

  assert!(matches!(
    scatter.scatter(&Vector::zeros(4), &mut dst),
    Err(EvpError::ShapeMismatch { .. })
  ));
  assert!(matches!(
    scatter.scatter(&src, &mut Vector::zeros(6)),
    Err(EvpError::ShapeMismatch { .. })
  ));
}
