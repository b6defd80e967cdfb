//! Domain error taxonomy shared by the entry and link services

use crate::model::{UserId, ValidationError};
use crate::storage::StorageError;
use thiserror::Error;

/// The four failure kinds callers branch on.
///
/// Transport adapters map these onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the entry and link services
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("unauthorized: {requester} does not own {resource}")]
    Unauthorized { resource: String, requester: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[source] StorageError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn unauthorized(resource: impl std::fmt::Display, requester: Option<&UserId>) -> Self {
        Self::Unauthorized {
            resource: resource.to_string(),
            requester: match requester {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => "<anonymous>".to_string(),
            },
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EntryNotFound(id) => Self::NotFound(format!("entry {id}")),
            StorageError::LinkNotFound(key) => Self::NotFound(format!("link {key}")),
            StorageError::Constraint(msg) => Self::InvalidInput(ValidationError::Rejected(msg)),
            other => Self::Internal(other),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
