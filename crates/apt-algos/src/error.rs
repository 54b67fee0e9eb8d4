use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("expected {expected} weights, got {actual}")]
    WeightCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Core(#[from] apt_core::Error),
}
