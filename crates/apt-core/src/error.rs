use thiserror::Error;

/// Errors raised by the core data model and graph primitive.
///
/// These map onto the four error kinds of the engine's error design: a
/// negative similarity or an edge pointing at an unknown node is an
/// [`Error::Internal`] invariant violation, never recovered from silently.
#[derive(Debug, Error)]
pub enum Error {
    #[error("similarity must be non-negative, got {0}")]
    NegativeSimilarity(f64),

    #[error("neighbor list references unknown node '{0}'")]
    UnknownNode(String),
}
