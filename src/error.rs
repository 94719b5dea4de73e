use common::linalg::faer::FactorizationError;

pub type Result<T> = std::result::Result<T, EvpError>;

#[derive(Debug, thiserror::Error)]
pub enum EvpError {
  #[error("shape mismatch for {what}: expected {expected}, got {got}")]
  ShapeMismatch {
    what: &'static str,
    expected: usize,
    got: usize,
  },
  #[error("index {index} out of range, only {bound} available")]
  OutOfRange { index: usize, bound: usize },
  #[error("configuration conflict: {0}")]
  ConfigurationConflict(String),
  #[error("eigen engine failure: {0}")]
  EngineFailure(String),
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("vtk export failed: {0}")]
  Vtk(String),
}

impl From<FactorizationError> for EvpError {
  fn from(e: FactorizationError) -> Self {
    Self::EngineFailure(e.to_string())
  }
}

pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
  if expected != got {
    return Err(EvpError::ShapeMismatch {
      what,
      expected,
      got,
    });
  }
  Ok(())
}
