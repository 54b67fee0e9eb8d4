use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),

    #[error("reading {path}: {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing params file: {0}")]
    ParamsToml(#[from] toml::de::Error),

    #[error(transparent)]
    Pipeline(#[from] apt_pipeline::Error),
}
