use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, AccountError>;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("wrong password")]
    WrongPassword,
    #[error("invalid password: {0}")]
    InvalidPassword(String),
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}
