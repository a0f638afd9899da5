use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Formato de fecha inválido. Se esperaba dd/MM/yyyy, recibido: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, &'static str),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for failures caused by caller input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::InvalidDateFormat(_))
    }

    /// True for failures of an outbound model call.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Embedding(_) | Error::Completion(_))
    }
}
