use serde::Serialize;
use uuid::Uuid;

/// Broad grouping of [`ServiceError`] variants, used by callers that only care about
/// whether a failure was their input, a dangling reference, a lifecycle rule or the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Reference,
    State,
    Concurrency,
    Infrastructure,
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unresolved {kind} reference: {id}")]
    ReferenceError { kind: String, id: Uuid },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Cannot transition from status '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Quote already accepted: {0}")]
    AlreadyAccepted(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Convenience constructor for a catalog reference that no longer resolves.
    pub fn reference(kind: impl Into<String>, id: Uuid) -> Self {
        ServiceError::ReferenceError {
            kind: kind.into(),
            id,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError(_) | Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::NotFound(_) | Self::ReferenceError { .. } => ErrorCategory::Reference,
            Self::InvalidStatus(_) | Self::InvalidTransition { .. } | Self::AlreadyAccepted(_) => {
                ErrorCategory::State
            }
            Self::Conflict(_) | Self::ConcurrentModification(_) => ErrorCategory::Concurrency,
            Self::RepositoryError(_) | Self::EventError(_) | Self::InternalError(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }

    /// Whether re-reading and retrying the operation may succeed.
    /// Lifecycle errors are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::ConcurrentModification(_))
    }
}
