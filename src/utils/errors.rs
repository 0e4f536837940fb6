use thiserror::Error;

/// Main error type for Contexture
#[derive(Error, Debug)]
pub enum ContextureError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Import parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Assembly was cancelled")]
    Cancelled,
}
