/// Task lifecycle management
///
/// Creation, merge-patch updates and deletion of tasks, with the two
/// derived behaviors kept in one transaction with the write:
///
/// 1. `completed_at` follows the status (see [`CompletionChange`])
/// 2. A new, non-null assignee receives exactly one notification
///
/// Updates lock the task row first, so concurrent patches to one task are
/// applied one after another.
///
/// A task that does not exist is reported as `NotFound` before membership
/// in its project is checked.

use chrono::Utc;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::notifications::{self, NotificationDispatcher};
use super::projects::find_project;
use crate::auth::authorization::{require_member, resolve_membership};
use crate::error::{CoreError, CoreResult};
use crate::models::task::{
    assignment_recipient, CompletionChange, CreateTask, Task, UpdateTask,
};

async fn find_task<'e, E>(executor: E, task_id: Uuid) -> CoreResult<Task>
where
    E: PgExecutor<'e>,
{
    Task::find_by_id(executor, task_id)
        .await?
        .ok_or(CoreError::NotFound("Task"))
}

/// Rejects an assignee who is not a member of the project
async fn ensure_assignable<'e, E>(
    executor: E,
    project_id: Uuid,
    assignee_id: Uuid,
) -> CoreResult<()>
where
    E: PgExecutor<'e>,
{
    if resolve_membership(executor, project_id, assignee_id).await?.is_none() {
        return Err(CoreError::InvalidOperation(
            "Assignee must be a member of the project".to_string(),
        ));
    }

    Ok(())
}

/// Task operations scoped by project membership
#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a task in a project the caller belongs to
    ///
    /// An assignee given at creation gets one "assigned" notification.
    pub async fn create_task(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
        data: CreateTask,
    ) -> CoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let project = find_project(&mut *tx, project_id).await?;
        require_member(&mut *tx, project_id, caller_id).await?;

        if let Some(assignee_id) = data.assignee_id {
            ensure_assignable(&mut *tx, project_id, assignee_id).await?;
        }

        let task = Task::create(&mut *tx, project_id, data).await?;

        if let Some(assignee_id) = task.assignee_id {
            let (title, message) = notifications::task_assigned(&project.name, &task.title);
            NotificationDispatcher::emit(&mut *tx, assignee_id, &title, &message).await?;
        }

        tx.commit().await?;

        tracing::info!(
            task_id = %task.id,
            project_id = %project_id,
            user_id = %caller_id,
            "Task created"
        );

        Ok(task)
    }

    /// Returns a task from a project the caller belongs to
    pub async fn get_task(&self, caller_id: Uuid, task_id: Uuid) -> CoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = find_task(&mut *tx, task_id).await?;
        require_member(&mut *tx, task.project_id, caller_id).await?;

        tx.commit().await?;
        Ok(task)
    }

    /// Applies a merge-patch to a task
    ///
    /// # Errors
    ///
    /// - `EmptyUpdate` if the patch carries no field, before any store access
    /// - `NotFound` if the task doesn't exist
    /// - `Forbidden` if the caller is not a member of the task's project
    /// - `InvalidOperation` if the new assignee is not a member
    pub async fn update_task(
        &self,
        caller_id: Uuid,
        task_id: Uuid,
        patch: UpdateTask,
    ) -> CoreResult<Task> {
        if patch.is_empty() {
            return Err(CoreError::EmptyUpdate);
        }

        let mut tx = self.pool.begin().await?;

        // Status and assignee decisions below are made against the locked row
        let current = Task::find_by_id_for_update(&mut *tx, task_id)
            .await?
            .ok_or(CoreError::NotFound("Task"))?;
        require_member(&mut *tx, current.project_id, caller_id).await?;

        if let Some(Some(assignee_id)) = patch.assignee_id {
            ensure_assignable(&mut *tx, current.project_id, assignee_id).await?;
        }

        let completion = CompletionChange::for_transition(current.status, patch.status, Utc::now());
        let recipient = assignment_recipient(current.assignee_id, patch.assignee_id);

        let task = Task::update(&mut *tx, task_id, patch, completion)
            .await?
            .ok_or(CoreError::NotFound("Task"))?;

        if let Some(recipient) = recipient {
            let project = find_project(&mut *tx, task.project_id).await?;
            let (title, message) = notifications::assignment_changed(&project.name, &task.title);
            NotificationDispatcher::emit(&mut *tx, recipient, &title, &message).await?;
        }

        tx.commit().await?;

        tracing::info!(
            task_id = %task_id,
            user_id = %caller_id,
            status = task.status.as_str(),
            "Task updated"
        );

        Ok(task)
    }

    /// Deletes a task; no notification is emitted
    pub async fn delete_task(&self, caller_id: Uuid, task_id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let task = find_task(&mut *tx, task_id).await?;
        require_member(&mut *tx, task.project_id, caller_id).await?;

        Task::delete(&mut *tx, task_id).await?;

        tx.commit().await?;

        tracing::info!(task_id = %task_id, user_id = %caller_id, "Task deleted");

        Ok(())
    }

    /// Lists a project's tasks, newest first
    pub async fn list_for_project(
        &self,
        caller_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;

        find_project(&mut *tx, project_id).await?;
        require_member(&mut *tx, project_id, caller_id).await?;

        let tasks = Task::list_by_project(&mut *tx, project_id).await?;

        tx.commit().await?;
        Ok(tasks)
    }

    /// Lists tasks assigned to the caller across their projects
    pub async fn list_assigned(&self, caller_id: Uuid) -> CoreResult<Vec<Task>> {
        Ok(Task::list_assigned(&self.pool, caller_id).await?)
    }
}
