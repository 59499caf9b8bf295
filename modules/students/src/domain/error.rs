use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Student not found: {name}")]
    StudentNotFound { name: String },

    /// Opening the store or ensuring its schema failed.
    #[error("{message}")]
    StorageUnavailable { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn student_not_found(name: impl Into<String>) -> Self {
        Self::StudentNotFound { name: name.into() }
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
