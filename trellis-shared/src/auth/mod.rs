/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing and the password policy
/// - [`jwt`]: HS256 session token encoding and validation
/// - [`session`]: The credential and session authority
/// - [`authorization`]: Project membership resolution and role checks
/// - [`middleware`]: Axum middleware that authenticates bearer tokens
///
/// # Example
///
/// ```no_run
/// use trellis_shared::auth::password::{hash_password, verify_password};
/// use trellis_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password1")?;
/// assert!(verify_password("user_password1", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "ada@example.com", "trellis", Duration::hours(1));
/// let token = create_token(&claims, "secret-key-that-is-at-least-32-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod session;
pub mod middleware;
pub mod authorization;
