/// Project endpoints
///
/// # Endpoints
///
/// - `POST   /v1/projects` - Create a project, caller becomes admin
/// - `GET    /v1/projects` - Projects the caller belongs to
/// - `GET    /v1/projects/:id` - One project (member)
/// - `PUT    /v1/projects/:id` - Merge-patch name/description (admin)
/// - `DELETE /v1/projects/:id` - Delete with tasks and memberships (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use trellis_shared::{
    auth::middleware::AuthContext,
    models::project::{CreateProject, Project, UpdateProject},
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

impl CreateProjectRequest {
    fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let req = req.trimmed();
    super::validate(&req)?;

    let project = state
        .projects
        .create_project(
            auth.user_id,
            CreateProject {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_projects(auth.user_id).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get_project(auth.user_id, project_id).await?))
}

/// Merge-patch a project
///
/// ```text
/// PUT /v1/projects/:id
///
/// { "description": null }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty patch
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such project
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(mut patch): Json<UpdateProject>,
) -> ApiResult<Json<Project>> {
    if let Some(name) = patch.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() || name.chars().count() > 255 {
            return Err(ApiError::invalid_field("name", "Name must be 1-255 characters"));
        }
    }

    let project = state
        .projects
        .update_project(auth.user_id, project_id, patch)
        .await?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.projects.delete_project(auth.user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
