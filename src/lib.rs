//! Generalized Hermitian eigenvalue problems $K x = lambda M x$ of finite element operators.
//!
//! Galerkin matrices are restricted to the degrees of freedom not fixed by boundary conditions,
//! handed to a shift-and-invert eigen engine and the eigenvectors are scattered back into
//! full-space finite element functions.

extern crate nalgebra as na;

pub mod assemble;
pub mod dof;
pub mod engine;
pub mod error;
pub mod io;
pub mod mesh;
pub mod operators;
pub mod options;
pub mod reduce;
pub mod scatter;
pub mod session;

pub use error::{EvpError, Result};
pub use session::{EigenSolver, Eigenpair};

pub type Dim = usize;
