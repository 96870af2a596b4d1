/// Project-scoped authorization
///
/// Every project or task operation resolves the caller's membership in the
/// target project before touching anything else.
///
/// # Permission Model
///
/// Role order is `admin > member > none`:
///
/// 1. **Membership**: resolved per (project, user); absence means no rights
/// 2. **Member**: read the project, manage its tasks
/// 3. **Admin**: additionally manage members and the project itself
///
/// Checks are read-only and take any `PgExecutor`, so they run inside the
/// same transaction as the mutation they guard.
///
/// # Example
///
/// ```no_run
/// use trellis_shared::auth::authorization::{require_admin, require_member};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let membership = require_member(&pool, project_id, user_id).await?;
/// require_admin(&pool, project_id, user_id).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::membership::{Membership, ProjectRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// User doesn't have required role
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: ProjectRole,
        actual: ProjectRole,
    },

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Resolves the caller's membership in a project
///
/// Returns `None` when the user holds no membership. No side effects.
pub async fn resolve_membership<'e, E>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    Membership::find(executor, project_id, user_id).await
}

/// Checks a resolved membership against a required role
///
/// Pure counterpart of [`require_role`], shared by every check.
pub fn check_role(
    project_id: Uuid,
    membership: Option<Membership>,
    required: ProjectRole,
) -> Result<Membership, AuthzError> {
    let membership = membership.ok_or(AuthzError::NotMember(project_id))?;

    if !membership.role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: membership.role,
        });
    }

    Ok(membership)
}

/// Requires the user to hold at least `required` in the project
///
/// # Errors
///
/// - `AuthzError::NotMember` if the user has no membership
/// - `AuthzError::InsufficientRole` if the role is too low
pub async fn require_role<'e, E>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
    required: ProjectRole,
) -> Result<Membership, AuthzError>
where
    E: PgExecutor<'e>,
{
    let membership = resolve_membership(executor, project_id, user_id).await?;

    check_role(project_id, membership, required).map_err(|e| {
        tracing::debug!(
            project_id = %project_id,
            user_id = %user_id,
            required = required.as_str(),
            "Authorization denied"
        );
        e
    })
}

/// Requires any membership in the project
pub async fn require_member<'e, E>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError>
where
    E: PgExecutor<'e>,
{
    require_role(executor, project_id, user_id, ProjectRole::Member).await
}

/// Requires an admin membership in the project
pub async fn require_admin<'e, E>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError>
where
    E: PgExecutor<'e>,
{
    require_role(executor, project_id, user_id, ProjectRole::Admin).await
}
