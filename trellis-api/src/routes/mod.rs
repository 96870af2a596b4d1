/// API route handlers
///
/// Handlers are thin: extract, validate, call a core service, map the
/// result. Every handler except `health` and `auth` runs behind the
/// session middleware and receives the caller as `Extension<AuthContext>`.
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: The caller's profile
/// - `projects`: Project lifecycle
/// - `members`: Project membership
/// - `tasks`: Task lifecycle
/// - `notifications`: The caller's inbox
/// - `analysis`: Project analysis

pub mod analysis;
pub mod auth;
pub mod health;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;

use validator::Validate;

use crate::error::ApiResult;

/// Runs `validator` rules on a request body
pub(crate) fn validate<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate()?;
    Ok(())
}
