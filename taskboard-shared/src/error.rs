/// Domain error taxonomy
///
/// Every service operation fails with a [`DomainError`]. Its [`ErrorKind`] is
/// what callers branch on; the API layer maps each kind to one HTTP status.
///
/// Lower-level errors convert with their meaning preserved: a missing row
/// stays `NotFound`, a duplicate becomes `Conflict`, and an authorization
/// failure is always `Forbidden`.

use crate::auth::{authorization::AuthzError, jwt::JwtError, password::PasswordError};
use crate::repository::RepoError;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Forbidden,
    Unauthorized,
    Internal,
}

/// Error returned by the user and task services
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        DomainError::InvalidInput(msg.into())
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            DomainError::InvalidInput(m)
            | DomainError::NotFound(m)
            | DomainError::Conflict(m)
            | DomainError::Forbidden(m)
            | DomainError::Unauthorized(m)
            | DomainError::Internal(m) => m,
        }
    }
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { .. } => DomainError::NotFound(err.to_string()),
            RepoError::DuplicateEmail(_)
            | RepoError::AlreadyAssigned { .. }
            | RepoError::AlreadyCompleted(_) => DomainError::Conflict(err.to_string()),
            RepoError::NotAssigned { .. } => DomainError::InvalidInput(err.to_string()),
            RepoError::Database(e) => DomainError::Internal(e.to_string()),
        }
    }
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        DomainError::Internal(err.to_string())
    }
}

impl From<JwtError> for DomainError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(_) => DomainError::Internal(err.to_string()),
            _ => DomainError::Unauthorized(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::TaskAction;
    use uuid::Uuid;

    #[test]
    fn test_repo_errors_keep_their_kind() {
        let id = Uuid::new_v4();
        assert_eq!(
            DomainError::from(RepoError::task_not_found(id)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DomainError::from(RepoError::DuplicateEmail("a@b.c".into())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DomainError::from(RepoError::AlreadyAssigned { task: id, user: id }).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DomainError::from(RepoError::AlreadyCompleted(id)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DomainError::from(RepoError::NotAssigned { task: id, user: id }).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            DomainError::from(RepoError::Database(sqlx::Error::RowNotFound)).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_authz_is_always_forbidden() {
        let err = DomainError::from(AuthzError::NotCreator {
            task: Uuid::new_v4(),
            action: TaskAction::Delete,
        });
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.message().contains("delete it"));
    }

    #[test]
    fn test_jwt_errors() {
        assert_eq!(DomainError::from(JwtError::Expired).kind(), ErrorKind::Unauthorized);
        assert_eq!(
            DomainError::from(JwtError::CreateError("boom".into())).kind(),
            ErrorKind::Internal
        );
    }
}
