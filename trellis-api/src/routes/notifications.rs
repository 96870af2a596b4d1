/// Notification inbox endpoints
///
/// A caller only ever sees and flips their own notifications. Marking
/// someone else's notification, or one already read, is a silent no-op.
///
/// # Endpoints
///
/// - `GET  /v1/notifications?limit=N` - Newest first (default 10, max 100)
/// - `GET  /v1/notifications/unread-count`
/// - `POST /v1/notifications/:id/read`
/// - `POST /v1/notifications/read-all`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use trellis_shared::{auth::middleware::AuthContext, models::notification::Notification};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    /// How many notifications flipped to read
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = state
        .notifications
        .list_for(auth.user_id, query.limit)
        .await?;

    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread = state.notifications.unread_count(auth.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .notifications
        .mark_read(auth.user_id, notification_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = state.notifications.mark_all_read(auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
