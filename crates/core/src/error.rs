use thiserror::Error;

/// Errors produced by the core primitive types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
