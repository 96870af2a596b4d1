/// Task model and database operations
///
/// Tasks belong to exactly one project and optionally to one assignee.
///
/// # State Machine
///
/// ```text
/// pending ⇄ in-progress ⇄ done
/// pending ⇄ done
/// ```
///
/// Every transition is allowed, including reopening a finished task.
/// `completed_at` is derived from the status and never set by callers:
/// it is non-null exactly when the status is `done`. The table enforces the
/// same rule with a CHECK constraint.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'critical');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     category VARCHAR(100),
///     story_points INTEGER NOT NULL DEFAULT 1 CHECK (story_points >= 0),
///     due_date TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_completed_at_matches_status
///         CHECK ((status = 'done') = (completed_at IS NOT NULL))
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use trellis_shared::models::task::{Task, CreateTask, TaskStatus, CompletionChange};
/// use trellis_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, Uuid::new_v4(), CreateTask {
///     title: "Write release notes".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let change = CompletionChange::for_transition(task.status, Some(TaskStatus::Done), chrono::Utc::now());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::present;

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Pending,

    /// Being worked on
    InProgress,

    /// Finished; `completed_at` is set
    Done,
}

impl TaskStatus {
    /// Converts status to its wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Assigned user, if any
    pub assignee_id: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub category: Option<String>,

    /// Effort estimate
    pub story_points: i32,

    pub due_date: Option<DateTime<Utc>>,

    /// Set on transition into `done`, cleared on transition out of it
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when the due date has passed and the task is not done
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.status.is_done() && due < now,
            None => false,
        }
    }

    /// Whole days past the due date; zero when not overdue
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        match self.due_date {
            Some(due) if self.is_overdue(now) => (now - due).num_days(),
            _ => 0,
        }
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default = "default_story_points")]
    pub story_points: i32,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

impl Default for CreateTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            category: None,
            story_points: default_story_points(),
            due_date: None,
            assignee_id: None,
        }
    }
}

fn default_story_points() -> i32 {
    1
}

/// Merge-patch for a task
///
/// Absent fields are untouched. For nullable columns `Some(None)` clears
/// the value. `completed_at` is deliberately not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<i32>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<Uuid>>,
}

impl UpdateTask {
    /// True when the patch carries no field at all
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.story_points.is_none()
            && self.due_date.is_none()
            && self.assignee_id.is_none()
    }
}

/// What an update does to `completed_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    /// Leave the column as it is
    Unchanged,

    /// Stamp the column with this time
    Set(DateTime<Utc>),

    /// Null the column
    Clear,
}

impl CompletionChange {
    /// Derives the `completed_at` effect of moving from `previous` to `next`
    ///
    /// `next` is `None` when the patch does not touch the status.
    /// Re-setting `done` on a finished task keeps its original timestamp.
    pub fn for_transition(
        previous: TaskStatus,
        next: Option<TaskStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let Some(next) = next else {
            return CompletionChange::Unchanged;
        };

        match (previous, next) {
            (TaskStatus::Done, TaskStatus::Done) => CompletionChange::Unchanged,
            (TaskStatus::Done, TaskStatus::Pending | TaskStatus::InProgress) => {
                CompletionChange::Clear
            }
            (TaskStatus::Pending | TaskStatus::InProgress, TaskStatus::Done) => {
                CompletionChange::Set(now)
            }
            (
                TaskStatus::Pending | TaskStatus::InProgress,
                TaskStatus::Pending | TaskStatus::InProgress,
            ) => CompletionChange::Unchanged,
        }
    }
}

/// Returns the user to notify about an assignment change, if any
///
/// Only a new, non-null assignee different from the previous one is
/// notified. `patch` is the patch's `assignee_id` field.
pub fn assignment_recipient(previous: Option<Uuid>, patch: Option<Option<Uuid>>) -> Option<Uuid> {
    match patch {
        Some(Some(next)) if previous != Some(next) => Some(next),
        _ => None,
    }
}

const TASK_COLUMNS: &str = "id, project_id, assignee_id, title, description, status, priority, \
     category, story_points, due_date, completed_at, created_at, updated_at";

impl Task {
    /// Inserts a task row
    ///
    /// `completed_at` is stamped when the task is created directly as done.
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let completed_at = data.status.is_done().then(Utc::now);

        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (
                project_id, assignee_id, title, description, status, priority,
                category, story_points, due_date, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(project_id)
        .bind(data.assignee_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.category)
        .bind(data.story_points)
        .bind(data.due_date)
        .bind(completed_at)
        .fetch_one(executor)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a task by ID and locks its row until the transaction ends
    ///
    /// Concurrent writers to the same task queue here and each see the row
    /// as the previous writer committed it.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 FOR UPDATE",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists a project's tasks, newest first
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
            TASK_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Lists tasks assigned to a user in projects the user still belongs to
    pub async fn list_assigned<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.assignee_id, t.title, t.description, t.status,
                   t.priority, t.category, t.story_points, t.due_date, t.completed_at,
                   t.created_at, t.updated_at
            FROM tasks t
            JOIN project_members m ON m.project_id = t.project_id AND m.user_id = t.assignee_id
            WHERE t.assignee_id = $1
            ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Applies a merge-patch plus the derived `completed_at` change
    ///
    /// Returns `None` if the task doesn't exist.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTask,
        completion: CompletionChange,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, query: &mut String| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.title.is_some() {
            push("title", &mut query);
        }
        if data.description.is_some() {
            push("description", &mut query);
        }
        if data.status.is_some() {
            push("status", &mut query);
        }
        if data.priority.is_some() {
            push("priority", &mut query);
        }
        if data.category.is_some() {
            push("category", &mut query);
        }
        if data.story_points.is_some() {
            push("story_points", &mut query);
        }
        if data.due_date.is_some() {
            push("due_date", &mut query);
        }
        if data.assignee_id.is_some() {
            push("assignee_id", &mut query);
        }
        match completion {
            CompletionChange::Set(_) => push("completed_at", &mut query),
            CompletionChange::Clear => query.push_str(", completed_at = NULL"),
            CompletionChange::Unchanged => {}
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TASK_COLUMNS));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(category) = data.category {
            q = q.bind(category);
        }
        if let Some(story_points) = data.story_points {
            q = q.bind(story_points);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(assignee_id) = data.assignee_id {
            q = q.bind(assignee_id);
        }
        if let CompletionChange::Set(at) = completion {
            q = q.bind(at);
        }

        q.fetch_optional(executor).await
    }

    /// Deletes a task; returns true if a row was removed
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every task of a project; returns the number removed
    pub async fn delete_by_project<'e, E>(executor: E, project_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(status: TaskStatus, due_date: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assignee_id: None,
            title: "t".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            category: None,
            story_points: 1,
            due_date,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
        let status: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(status, TaskStatus::Done);
        assert!(serde_json::from_str::<TaskStatus>("\"in_progress\"").is_err());
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
    }

    #[test]
    fn test_completion_into_done_sets_timestamp() {
        let now = Utc::now();
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::Pending, Some(TaskStatus::Done), now),
            CompletionChange::Set(now)
        );
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::InProgress, Some(TaskStatus::Done), now),
            CompletionChange::Set(now)
        );
    }

    #[test]
    fn test_completion_out_of_done_clears_timestamp() {
        let now = Utc::now();
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::Done, Some(TaskStatus::Pending), now),
            CompletionChange::Clear
        );
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::Done, Some(TaskStatus::InProgress), now),
            CompletionChange::Clear
        );
    }

    #[test]
    fn test_completion_untouched_otherwise() {
        let now = Utc::now();
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::Done, Some(TaskStatus::Done), now),
            CompletionChange::Unchanged
        );
        assert_eq!(
            CompletionChange::for_transition(
                TaskStatus::Pending,
                Some(TaskStatus::InProgress),
                now,
            ),
            CompletionChange::Unchanged
        );
        assert_eq!(
            CompletionChange::for_transition(TaskStatus::Done, None, now),
            CompletionChange::Unchanged
        );
    }

    #[test]
    fn test_assignment_recipient() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(assignment_recipient(None, Some(Some(a))), Some(a));
        assert_eq!(assignment_recipient(Some(a), Some(Some(b))), Some(b));
        assert_eq!(assignment_recipient(Some(a), Some(Some(a))), None);
        assert_eq!(assignment_recipient(Some(a), Some(None)), None);
        assert_eq!(assignment_recipient(Some(a), None), None);
    }

    #[test]
    fn test_update_task_patch() {
        let patch: UpdateTask =
            serde_json::from_str(r#"{"assignee_id": null, "status": "in-progress"}"#).unwrap();
        assert_eq!(patch.assignee_id, Some(None));
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
        assert!(patch.title.is_none());
        assert!(!patch.is_empty());

        let empty: UpdateTask = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_create_task_defaults() {
        let data: CreateTask = serde_json::from_str(r#"{"title": "Ship it"}"#).unwrap();
        assert_eq!(data.status, TaskStatus::Pending);
        assert_eq!(data.priority, TaskPriority::Medium);
        assert_eq!(data.story_points, 1);
        assert!(data.assignee_id.is_none());
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let late = task(TaskStatus::Pending, Some(now - Duration::days(3)));
        assert!(late.is_overdue(now));
        assert_eq!(late.days_overdue(now), 3);

        let finished = task(TaskStatus::Done, Some(now - Duration::days(3)));
        assert!(!finished.is_overdue(now));
        assert_eq!(finished.days_overdue(now), 0);

        assert!(!task(TaskStatus::Pending, None).is_overdue(now));
    }
}
