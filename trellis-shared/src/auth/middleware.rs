/// Session authentication middleware for Axum
///
/// Extracts the `Authorization: Bearer <token>` header, resolves it through
/// the [`SessionAuthority`], and adds an [`AuthContext`] to the request
/// extensions. Requests without a valid session never reach the handler.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use trellis_shared::auth::middleware::{create_session_middleware, AuthContext};
/// use trellis_shared::auth::session::SessionAuthority;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.email
/// }
///
/// fn router(authority: SessionAuthority) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn(create_session_middleware(authority)))
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::session::SessionAuthority;
use crate::error::CoreError;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token rejected or its user is gone
    InvalidToken(String),

    /// Store failure while resolving the token
    DatabaseError(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidFormat(_)
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Missing credentials".to_string(),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg.clone(),
            AuthError::DatabaseError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::DatabaseError(ref msg) = self {
            tracing::error!("Session lookup failed: {}", msg);
        }

        let status = self.status();
        let body = Json(json!({
            "error": if status == StatusCode::UNAUTHORIZED {
                "unauthenticated"
            } else {
                "internal_error"
            },
            "message": self.message(),
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from an `Authorization` header value
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Session authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if the header is missing or malformed, or if
/// the token does not resolve to an existing user.
pub async fn session_auth_middleware(
    authority: SessionAuthority,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = bearer_token(auth_header)?;

    let user = authority.resolve_token(token).await.map_err(|e| match e {
        CoreError::Database(db) => AuthError::DatabaseError(db.to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: user.id,
        email: user.email,
    });

    Ok(next.run(req).await)
}

/// Creates a session middleware closure for `axum::middleware::from_fn`
pub fn create_session_middleware(
    authority: SessionAuthority,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    move |req, next| {
        let authority = authority.clone();
        Box::pin(session_auth_middleware(authority, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(matches!(bearer_token("Basic dXNlcjpwYXNz"), Err(AuthError::InvalidFormat(_))));
        assert!(matches!(bearer_token("Bearer "), Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidToken("Token has expired".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::DatabaseError("pool timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
