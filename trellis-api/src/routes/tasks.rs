/// Task endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/tasks` - Project tasks, newest first
/// - `POST   /v1/projects/:id/tasks` - Create a task
/// - `GET    /v1/tasks/assigned` - Tasks assigned to the caller
/// - `GET    /v1/tasks/:id` - One task
/// - `PATCH  /v1/tasks/:id` - Merge-patch a task
/// - `DELETE /v1/tasks/:id` - Delete a task
///
/// All of them require membership in the task's project.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use trellis_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
};
use uuid::Uuid;
use validator::Validate;

const MAX_TITLE_LENGTH: usize = 255;
const MAX_CATEGORY_LENGTH: usize = 100;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    #[serde(default = "default_story_points")]
    #[validate(range(min = 0, message = "Story points cannot be negative"))]
    pub story_points: i32,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

fn default_story_points() -> i32 {
    1
}

impl CreateTaskRequest {
    /// Trims the title so length rules apply to what gets stored
    fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self
    }
}

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            category: req.category,
            story_points: req.story_points,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        }
    }
}

/// Checks the fields of a patch that carry constraints
fn validate_patch(patch: &UpdateTask) -> ApiResult<()> {
    if let Some(ref title) = patch.title {
        let len = title.trim().chars().count();
        if len == 0 || len > MAX_TITLE_LENGTH {
            return Err(ApiError::invalid_field("title", "Title must be 1-255 characters"));
        }
    }

    if let Some(Some(ref category)) = patch.category {
        if category.chars().count() > MAX_CATEGORY_LENGTH {
            return Err(ApiError::invalid_field(
                "category",
                "Category must be at most 100 characters",
            ));
        }
    }

    if matches!(patch.story_points, Some(points) if points < 0) {
        return Err(ApiError::invalid_field(
            "story_points",
            "Story points cannot be negative",
        ));
    }

    Ok(())
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_for_project(auth.user_id, project_id).await?))
}

/// Create a task
///
/// ```text
/// POST /v1/projects/:id/tasks
///
/// {
///   "title": "Write launch checklist",
///   "priority": "high",
///   "story_points": 3,
///   "assignee_id": "uuid"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Assignee is not a project member
/// - `403 Forbidden`: Caller is not a project member
/// - `404 Not Found`: No such project
/// - `422 Unprocessable Entity`: Invalid fields
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let req = req.trimmed();
    super::validate(&req)?;

    let task = state
        .tasks
        .create_task(auth.user_id, project_id, req.into())
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_assigned(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_assigned(auth.user_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get_task(auth.user_id, task_id).await?))
}

/// Merge-patch a task
///
/// Absent fields are untouched, `null` clears a nullable field. Moving into
/// `done` stamps `completed_at`, moving out clears it.
///
/// ```text
/// PATCH /v1/tasks/:id
///
/// { "status": "done", "assignee_id": null }
/// ```
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(mut patch): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    validate_patch(&patch)?;

    if let Some(title) = patch.title.as_mut() {
        *title = title.trim().to_string();
    }

    Ok(Json(state.tasks.update_task(auth.user_id, task_id, patch).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks.delete_task(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
