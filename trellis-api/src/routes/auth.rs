/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new identity and get a token
/// - `POST /v1/auth/login` - Verify credentials and get a token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use trellis_shared::{auth::password, models::user::User};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked again against the full password policy
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Session issued by register and login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,

    pub access_token: String,

    /// Always `Bearer`
    pub token_type: &'static str,

    /// Token lifetime in seconds
    pub expires_in: i64,
}

impl SessionResponse {
    fn issue(state: &AppState, user: User) -> ApiResult<Self> {
        let access_token = state.sessions.issue_token(&user)?;

        Ok(Self {
            user,
            access_token,
            token_type: "Bearer",
            expires_in: state.sessions.config().token_ttl.num_seconds(),
        })
    }
}

/// Registers a new identity
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical1"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Invalid email or weak password
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    super::validate(&req)?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let user = state.sessions.register(&req.email, &req.password).await?;

    Ok((StatusCode::CREATED, Json(SessionResponse::issue(&state, user)?)))
}

/// Logs in with email and password
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical1"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    super::validate(&req)?;

    let user = state
        .sessions
        .authenticate(&req.email, &req.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(SessionResponse::issue(&state, user)?))
}
