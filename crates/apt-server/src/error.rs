use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown session '{0}'")]
    UnknownSession(String),

    #[error(transparent)]
    Pipeline(#[from] apt_pipeline::Error),

    #[error(transparent)]
    Store(#[from] apt_store::Error),
}
