use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode store file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("no feature graphs found for user '{0}'")]
    UserNotFound(String),

    #[error("malformed k.txt contents: {0:?}")]
    InvalidK(String),

    #[error(transparent)]
    Core(#[from] apt_core::Error),
}
