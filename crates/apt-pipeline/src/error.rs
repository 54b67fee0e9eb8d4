use thiserror::Error;

/// The four error kinds of the engine's error design (spec §7). Validation
/// and store failures collapse to a single query-level failure boundary;
/// `Internal` represents an invariant violation and is never swallowed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("query refused: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] apt_store::Error),

    #[error(transparent)]
    Internal(#[from] apt_core::Error),

    #[error(transparent)]
    Algo(#[from] apt_algos::Error),
}
