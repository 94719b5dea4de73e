pub mod faer;
pub mod nalgebra;
pub mod petsc;
