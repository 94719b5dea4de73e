//! Dirichlet eigenmodes of the Laplacian on the unit square.

use ghep::{
  dof::DirichletBc,
  io,
  mesh::CartesianMeshInfo,
  operators::{LaplaceElmat, MassElmat},
  options::SolverOptions,
  EigenSolver,
};

use std::f64::consts::PI;

fn main() -> ghep::Result<()> {
  tracing_subscriber::fmt::init();

  let dim = 2;
  let ncells_axis = 100;
  let neigen = 10;

  let mesh = CartesianMeshInfo::new_unit(dim, ncells_axis).to_mesh();
  let bcs = [DirichletBc::on_boundary(&mesh)];

  let mut solver =
    EigenSolver::from_forms(&mesh, LaplaceElmat, MassElmat, &bcs, SolverOptions::new())?;
  let report = solver.solve(neigen)?;
  println!("{report}");

  let eigenvals = solver.eigenvalues(neigen.min(solver.nconv()))?;
  for eigenval in eigenvals.iter() {
    println!("eigenval={eigenval:.6}, in units of pi^2={:.4}", eigenval / (PI * PI));
  }

  std::fs::create_dir_all("out")?;
  io::save_eigenvalues(&eigenvals, "out/eigenvalues.txt")?;
  io::save_eigenvectors(&solver, &mesh, eigenvals.len(), "out/modes", false)?;

  Ok(())
}
