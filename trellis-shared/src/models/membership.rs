/// Membership model and database operations
///
/// This module provides the Membership model for user-project relationships.
/// Each row grants one user one role inside one project.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'member');
///
/// CREATE TABLE project_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT project_members_project_user_key UNIQUE (project_id, user_id)
/// );
/// ```
///
/// The unique constraint on `(project_id, user_id)` is what keeps two
/// concurrent invites from both succeeding. Role updates and removals
/// address the row by its own `id`.
///
/// # Roles
///
/// - **admin**: Manage members, edit and delete the project
/// - **member**: Create and manage tasks within the project
///
/// # Example
///
/// ```no_run
/// use trellis_shared::models::membership::{Membership, CreateMembership, ProjectRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let membership = Membership::create(&pool, CreateMembership {
///     project_id,
///     user_id,
///     role: ProjectRole::Member,
/// }).await?;
///
/// let found = Membership::find(&pool, project_id, user_id).await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Roles within a single project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Full project control
    Admin,

    /// Operate within the project, no administrative actions
    Member,
}

impl ProjectRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Member => "member",
        }
    }

    /// Checks if this role has at least the permission level of `required`
    ///
    /// Hierarchy: Admin > Member
    pub fn has_permission(&self, required: &ProjectRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Numeric permission level; "no membership" sits below every role at 0
    pub fn permission_level(&self) -> u8 {
        match self {
            ProjectRole::Admin => 2,
            ProjectRole::Member => 1,
        }
    }
}

/// Membership model representing a user-project relationship with role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Membership ID, used to address role updates and removals
    pub id: Uuid,

    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Membership joined with the member's user record, for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberDetail {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub project_id: Uuid,

    pub user_id: Uuid,

    /// Role to assign (defaults to Member)
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

const MEMBERSHIP_COLUMNS: &str = "id, project_id, user_id, role, created_at";

impl Membership {
    /// Creates a new membership (adds user to project)
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the (project, user) pair already exists,
    /// or a foreign key violation if either side doesn't exist.
    pub async fn create<'e, E>(executor: E, data: CreateMembership) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3) RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    /// Finds the membership for a (project, user) pair
    pub async fn find<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {} FROM project_members WHERE project_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a membership by its own ID, scoped to a project
    ///
    /// A membership ID from another project yields `None`.
    pub async fn find_in_project<'e, E>(
        executor: E,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {} FROM project_members WHERE id = $1 AND project_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(id)
        .bind(project_id)
        .fetch_optional(executor)
        .await
    }

    /// Updates the role of a membership addressed by ID
    pub async fn update_role<'e, E>(
        executor: E,
        id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            "UPDATE project_members SET role = $2 WHERE id = $1 RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a membership addressed by ID
    ///
    /// Returns true if a row was removed.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM project_members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every membership of a project; returns the number removed
    pub async fn delete_by_project<'e, E>(executor: E, project_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists members of a project with their user details, oldest first
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<MemberDetail>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, MemberDetail>(
            r#"
            SELECT m.id, m.project_id, m.user_id, m.role,
                   u.email, u.first_name, u.last_name, m.created_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Counts admins in a project
    pub async fn count_admins<'e, E>(executor: E, project_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = 'admin'",
        )
        .bind(project_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_role_as_str() {
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(ProjectRole::Admin.has_permission(&ProjectRole::Admin));
        assert!(ProjectRole::Admin.has_permission(&ProjectRole::Member));
        assert!(ProjectRole::Member.has_permission(&ProjectRole::Member));
        assert!(!ProjectRole::Member.has_permission(&ProjectRole::Admin));
        assert!(ProjectRole::Member.permission_level() > 0);
    }

    #[test]
    fn test_create_membership_default_role() {
        assert_eq!(default_role(), ProjectRole::Member);

        let data: CreateMembership = serde_json::from_value(serde_json::json!({
            "project_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
        }))
        .unwrap();
        assert_eq!(data.role, ProjectRole::Member);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&ProjectRole::Admin).unwrap(), "\"admin\"");
        let role: ProjectRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, ProjectRole::Member);
    }
}
