/// Project membership endpoints
///
/// Memberships are addressed by their own id, scoped to the project in the
/// path.
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/members` - List members (member)
/// - `POST   /v1/projects/:id/members` - Invite a registered user (admin)
/// - `PUT    /v1/projects/:id/members/:member_id` - Change role (admin)
/// - `DELETE /v1/projects/:id/members/:member_id` - Remove member (admin)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use trellis_shared::{
    auth::middleware::AuthContext,
    models::membership::{MemberDetail, Membership, ProjectRole},
};
use uuid::Uuid;
use validator::Validate;

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: ProjectRole,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberDetail>>> {
    Ok(Json(state.projects.list_members(auth.user_id, project_id).await?))
}

/// Invite a registered user by email
///
/// ```text
/// POST /v1/projects/:id/members
///
/// { "email": "bob@example.com", "role": "member" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No project, or no user with that email
/// - `409 Conflict`: Already a member
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    super::validate(&req)?;

    let membership = state
        .projects
        .invite_member(auth.user_id, project_id, &req.email, req.role)
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, membership_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<Membership>> {
    let membership = state
        .projects
        .update_member_role(auth.user_id, project_id, membership_id, req.role)
        .await?;

    Ok(Json(membership))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, membership_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .projects
        .remove_member(auth.user_id, project_id, membership_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
