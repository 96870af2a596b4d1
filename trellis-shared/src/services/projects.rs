/// Project and membership management
///
/// Every operation resolves the target project, authorizes the caller, then
/// mutates, all inside one transaction. Side-effect notifications are
/// written through the same transaction.
///
/// # Membership rules
///
/// - At most one membership per (project, user). The unique constraint is
///   the final arbiter: of two concurrent invites for the same pair exactly
///   one commits, the other gets `Conflict`.
/// - An admin cannot remove their own membership.
/// - The last admin of a project cannot be demoted.
///
/// # Example
///
/// ```no_run
/// use trellis_shared::services::projects::ProjectService;
/// use trellis_shared::models::membership::ProjectRole;
/// use trellis_shared::models::project::CreateProject;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, alice: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let projects = ProjectService::new(pool);
///
/// let project = projects.create_project(alice, CreateProject {
///     name: "Apollo".to_string(),
///     description: None,
/// }).await?;
///
/// projects.invite_member(alice, project.id, "bob@example.com", ProjectRole::Member).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::notifications::{self, NotificationDispatcher};
use crate::auth::authorization::{require_admin, require_member};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::membership::{CreateMembership, MemberDetail, Membership, ProjectRole};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::task::Task;
use crate::models::user::{normalize_email, User};

/// Loads a project or fails with `NotFound`
pub(crate) async fn find_project<'e, E>(executor: E, project_id: Uuid) -> CoreResult<Project>
where
    E: PgExecutor<'e>,
{
    Project::find_by_id(executor, project_id)
        .await?
        .ok_or(CoreError::NotFound("Project"))
}

/// Rejects an admin removing their own membership
pub fn check_removal(caller_id: Uuid, target: &Membership) -> CoreResult<()> {
    if target.user_id == caller_id {
        return Err(CoreError::InvalidOperation(
            "You cannot remove yourself from the project".to_string(),
        ));
    }

    Ok(())
}

/// Rejects a role change that would leave the project without an admin
///
/// `admin_count` is the number of admins before the change.
pub fn check_role_change(
    target: &Membership,
    new_role: ProjectRole,
    admin_count: i64,
) -> CoreResult<()> {
    let demotes_admin = target.role == ProjectRole::Admin && new_role != ProjectRole::Admin;

    if demotes_admin && admin_count <= 1 {
        return Err(CoreError::InvalidOperation(
            "A project must keep at least one admin".to_string(),
        ));
    }

    Ok(())
}

/// Maps an insert failure on `project_members` to the core taxonomy
fn membership_insert_error(err: sqlx::Error) -> CoreError {
    if is_unique_violation(&err) {
        CoreError::Conflict("User is already a member of this project".to_string())
    } else {
        CoreError::Database(err)
    }
}

/// Project lifecycle and membership operations
#[derive(Clone)]
pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a project with the caller as its first admin
    pub async fn create_project(
        &self,
        caller_id: Uuid,
        data: CreateProject,
    ) -> CoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let project = Project::create(&mut *tx, data).await?;

        Membership::create(
            &mut *tx,
            CreateMembership {
                project_id: project.id,
                user_id: caller_id,
                role: ProjectRole::Admin,
            },
        )
        .await
        .map_err(membership_insert_error)?;

        tx.commit().await?;

        tracing::info!(project_id = %project.id, user_id = %caller_id, "Project created");

        Ok(project)
    }

    /// Lists the projects the caller belongs to
    pub async fn list_projects(&self, caller_id: Uuid) -> CoreResult<Vec<Project>> {
        Ok(Project::list_for_user(&self.pool, caller_id).await?)
    }

    /// Returns a project the caller belongs to
    pub async fn get_project(&self, caller_id: Uuid, project_id: Uuid) -> CoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let project = find_project(&mut *tx, project_id).await?;
        require_member(&mut *tx, project_id, caller_id).await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Merge-patches name and description (admin only)
    pub async fn update_project(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
        patch: UpdateProject,
    ) -> CoreResult<Project> {
        if patch.is_empty() {
            return Err(CoreError::EmptyUpdate);
        }

        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_admin(&mut *tx, project_id, caller_id).await?;

        let project = Project::update(&mut *tx, project_id, patch)
            .await?
            .ok_or(CoreError::NotFound("Project"))?;

        tx.commit().await?;

        tracing::info!(project_id = %project_id, user_id = %caller_id, "Project updated");

        Ok(project)
    }

    /// Deletes a project with its tasks and memberships (admin only)
    ///
    /// Dependents are removed first, in order, in the same transaction.
    /// Notifications are left untouched.
    pub async fn delete_project(&self, caller_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_admin(&mut *tx, project_id, caller_id).await?;

        let tasks = Task::delete_by_project(&mut *tx, project_id).await?;
        let members = Membership::delete_by_project(&mut *tx, project_id).await?;
        Project::delete(&mut *tx, project_id).await?;

        tx.commit().await?;

        tracing::info!(
            project_id = %project_id,
            user_id = %caller_id,
            tasks,
            members,
            "Project deleted"
        );

        Ok(())
    }

    /// Lists members with their emails and roles
    pub async fn list_members(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<Vec<MemberDetail>> {
        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_member(&mut *tx, project_id, caller_id).await?;

        let members = Membership::list_by_project(&mut *tx, project_id).await?;

        tx.commit().await?;
        Ok(members)
    }

    /// Adds a registered user to the project (admin only)
    ///
    /// The invitee receives one "added to project" notification committed
    /// with the membership.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no user has that email
    /// - `Conflict` if the user is already a member, including when a
    ///   concurrent invite wins the race
    pub async fn invite_member(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
        email: &str,
        role: ProjectRole,
    ) -> CoreResult<Membership> {
        let mut tx = self.pool.begin().await?;

        let project = find_project(&mut *tx, project_id).await?;
        require_admin(&mut *tx, project_id, caller_id).await?;

        let invitee = User::find_by_email(&mut *tx, &normalize_email(email))
            .await?
            .ok_or(CoreError::NotFound("User"))?;

        if Membership::find(&mut *tx, project_id, invitee.id).await?.is_some() {
            return Err(CoreError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }

        let membership = Membership::create(
            &mut *tx,
            CreateMembership {
                project_id,
                user_id: invitee.id,
                role,
            },
        )
        .await
        .map_err(membership_insert_error)?;

        let (title, message) = notifications::added_to_project(&project.name);
        NotificationDispatcher::emit(&mut *tx, invitee.id, &title, &message).await?;

        tx.commit().await.map_err(membership_insert_error)?;

        tracing::info!(
            project_id = %project_id,
            user_id = %invitee.id,
            role = role.as_str(),
            "Member invited"
        );

        Ok(membership)
    }

    /// Changes a member's role (admin only)
    ///
    /// The admin count is read without row locks, so two admins demoting
    /// each other concurrently can still both succeed.
    pub async fn update_member_role(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
        membership_id: Uuid,
        role: ProjectRole,
    ) -> CoreResult<Membership> {
        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_admin(&mut *tx, project_id, caller_id).await?;

        let target = Membership::find_in_project(&mut *tx, project_id, membership_id)
            .await?
            .ok_or(CoreError::NotFound("Membership"))?;

        let admins = Membership::count_admins(&mut *tx, project_id).await?;
        check_role_change(&target, role, admins)?;

        let updated = Membership::update_role(&mut *tx, membership_id, role)
            .await?
            .ok_or(CoreError::NotFound("Membership"))?;

        tx.commit().await?;

        tracing::info!(
            project_id = %project_id,
            membership_id = %membership_id,
            role = role.as_str(),
            "Member role updated"
        );

        Ok(updated)
    }

    /// Removes another member from the project (admin only)
    pub async fn remove_member(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
        membership_id: Uuid,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_admin(&mut *tx, project_id, caller_id).await?;

        let target = Membership::find_in_project(&mut *tx, project_id, membership_id)
            .await?
            .ok_or(CoreError::NotFound("Membership"))?;

        check_removal(caller_id, &target)?;

        if !Membership::delete(&mut *tx, membership_id).await? {
            return Err(CoreError::NotFound("Membership"));
        }

        tx.commit().await?;

        tracing::info!(
            project_id = %project_id,
            user_id = %target.user_id,
            "Member removed"
        );

        Ok(())
    }
}
