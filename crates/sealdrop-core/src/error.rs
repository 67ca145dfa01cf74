use thiserror::Error;

pub type SealdropResult<T> = Result<T, SealdropError>;

/// Failures loading the shared configuration.
#[derive(Debug, Error)]
pub enum SealdropError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
