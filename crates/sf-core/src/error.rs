use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("version not found")]
    VersionNotFound,
}
