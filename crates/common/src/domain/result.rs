use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Payload parse error: {0}")]
    PayloadParseError(String),

    #[error("Content parse error: {0}")]
    ContentParseError(String),

    #[error("Schema read error: {0}")]
    SchemaReadError(anyhow::Error),

    #[error("Schema write error: {0}")]
    SchemaWriteError(anyhow::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    /// Malformed inbound data that the caller must fix; never worth retrying.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            DomainError::PayloadParseError(_)
                | DomainError::ContentParseError(_)
                | DomainError::ValidationError(_)
        )
    }
}
