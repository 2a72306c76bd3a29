use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid file: {0}")]
    Validation(String),
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Image handle error: {0}")]
    Handle(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
