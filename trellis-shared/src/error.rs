/// Core error taxonomy
///
/// Every service operation returns `Result<T, CoreError>`. Variants are
/// raised at the point of detection and travel unchanged to the HTTP
/// boundary, where `trellis-api` maps them to status codes.
///
/// # Kinds
///
/// | Variant              | Kind               |
/// |----------------------|--------------------|
/// | `Unauthenticated`    | Unauthenticated    |
/// | `InvalidCredentials` | Unauthenticated    |
/// | `Forbidden`          | Forbidden          |
/// | `NotFound`           | NotFound           |
/// | `Conflict`           | Conflict           |
/// | `DuplicateIdentity`  | Conflict           |
/// | `InvalidOperation`   | InvalidOperation   |
/// | `EmptyUpdate`        | InvalidOperation   |
/// | `ExternalService`    | ExternalService    |
/// | `Database`/`Internal`| Internal           |

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::services::analysis::SummarizerError;

/// Result alias for service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification used by the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    InvalidOperation,
    ExternalService,
    Internal,
}

/// Error type shared by all core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing, invalid or expired session token, or the identity is gone
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// Email/password pair did not match
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Authenticated but lacking membership or admin role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced project/task/membership/user does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness violation or other state clash
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Email is already registered
    #[error("Email is already registered")]
    DuplicateIdentity,

    /// Structurally valid but semantically disallowed
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Update carried no fields to change
    #[error("No fields to update")]
    EmptyUpdate,

    /// Summarizer unavailable or returned a malformed response
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else that should never reach a client verbatim
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns the coarse kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Unauthenticated(_) | CoreError::InvalidCredentials => {
                ErrorKind::Unauthenticated
            }
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) | CoreError::DuplicateIdentity => ErrorKind::Conflict,
            CoreError::InvalidOperation(_) | CoreError::EmptyUpdate => {
                ErrorKind::InvalidOperation
            }
            CoreError::ExternalService(_) => ErrorKind::ExternalService,
            CoreError::Database(_) | CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Returns true if the error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) => {
                CoreError::Forbidden("You are not a member of this project".to_string())
            }
            AuthzError::InsufficientRole { .. } => {
                CoreError::Forbidden("Project admin role required".to_string())
            }
            AuthzError::DatabaseError(e) => CoreError::Database(e),
        }
    }
}

impl From<JwtError> for CoreError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => CoreError::Internal(msg),
            JwtError::Expired => CoreError::Unauthenticated("Token expired".to_string()),
            other => CoreError::Unauthenticated(other.to_string()),
        }
    }
}

impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        CoreError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<SummarizerError> for CoreError {
    fn from(err: SummarizerError) -> Self {
        CoreError::ExternalService(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_kind_classification() {
        assert_eq!(CoreError::EmptyUpdate.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            CoreError::InvalidOperation("x".to_string()).kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(CoreError::DuplicateIdentity.kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::InvalidCredentials.kind(), ErrorKind::Unauthenticated);
        assert_eq!(CoreError::NotFound("Task").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ExternalService("down".to_string()).kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(CoreError::Database(sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_authz_errors_become_forbidden() {
        let err: CoreError = AuthzError::NotMember(Uuid::new_v4()).into();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_jwt_errors_become_unauthenticated() {
        let err: CoreError = JwtError::Expired.into();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let err: CoreError = JwtError::InvalidFormat("garbage".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(CoreError::NotFound("Membership").to_string(), "Membership not found");
    }

    #[test]
    fn test_row_not_found_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
