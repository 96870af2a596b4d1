/// The caller's own profile
///
/// - `GET /v1/users/me`
/// - `PUT /v1/users/me` - merge-patch of `first_name`, `last_name`, `title`;
///   an explicit `null` clears a field

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use trellis_shared::{
    auth::middleware::AuthContext,
    models::user::{UpdateProfile, User},
};

const MAX_NAME_LENGTH: usize = 100;

fn check_length(field: &str, value: &Option<Option<String>>) -> ApiResult<()> {
    if let Some(Some(v)) = value {
        if v.chars().count() > MAX_NAME_LENGTH {
            return Err(ApiError::invalid_field(
                field,
                format!("Must be at most {} characters", MAX_NAME_LENGTH),
            ));
        }
    }
    Ok(())
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state.sessions.profile(auth.user_id).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(patch): Json<UpdateProfile>,
) -> ApiResult<Json<User>> {
    check_length("first_name", &patch.first_name)?;
    check_length("last_name", &patch.last_name)?;
    check_length("title", &patch.title)?;

    let user = state.sessions.update_profile(auth.user_id, patch).await?;
    Ok(Json(user))
}
