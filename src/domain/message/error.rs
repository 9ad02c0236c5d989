use crate::domain::chunking::ChunkingError;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum MessageServiceError {
    #[error("message not found: {0}")]
    NotFound(String),
    #[error("invalid message: {0}")]
    Invalid(String),
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    #[error("processing run superseded: {0}")]
    Superseded(String),
    #[error("dependency error: {0}")]
    Dependency(String),
}

impl From<AppError> for MessageServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => MessageServiceError::NotFound(msg),
            AppError::BadRequest(msg) => MessageServiceError::Invalid(msg),
            AppError::Conflict(msg) => MessageServiceError::Superseded(msg),
            _ => MessageServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<MessageServiceError> for AppError {
    fn from(err: MessageServiceError) -> Self {
        match err {
            MessageServiceError::NotFound(msg) => AppError::NotFound(msg),
            MessageServiceError::Invalid(msg) => AppError::BadRequest(msg),
            MessageServiceError::Chunking(e) => AppError::BadRequest(e.to_string()),
            MessageServiceError::Superseded(msg) => AppError::Conflict(msg),
            MessageServiceError::Dependency(msg) => AppError::ExternalService(msg),
        }
    }
}
