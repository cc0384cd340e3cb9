use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("content type `{content_type}` is configured more than once")]
    DuplicateContentType { content_type: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn duplicate_content_type(content_type: impl Into<String>) -> Self {
        Self::DuplicateContentType {
            content_type: content_type.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
