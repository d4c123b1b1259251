use thiserror::Error;

pub type SesameResult<T> = Result<T, SesameError>;

#[derive(Debug, Error)]
pub enum SesameError {
    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
